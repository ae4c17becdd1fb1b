//! Stack pane rendering
//!
//! Lists the live stack slots from the bottom of the stack up. Pointer slots show
//! their target (or that they dangle) and class objects list their members.

use super::utils::{discipline_style, pointer_target_span, visible_items, ScrollState};
use crate::memory::{Content, MemoryBlock, MemoryManager};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

use super::utils::pane_block;

/// Render the stack pane
pub fn render_stack_pane(
    frame: &mut Frame,
    area: Rect,
    memory: &MemoryManager,
    is_focused: bool,
    scroll_state: &mut ScrollState,
) {
    let block = pane_block(" Stack ", is_focused);
    let content_width = area.width.saturating_sub(2) as usize;

    let mut slots: Vec<&MemoryBlock> = memory.live_blocks().filter(|b| b.is_stack()).collect();
    slots.sort_by_key(|b| b.address);

    let mut all_items = Vec::new();
    if slots.is_empty() {
        all_items.push(
            ListItem::new("(empty stack)").style(Style::default().fg(DEFAULT_THEME.comment)),
        );
    }

    for slot in slots {
        let (value_span, type_str, type_style) = match &slot.content {
            Content::Pointer(pointer) => (
                pointer_target_span(slot, memory),
                pointer.discipline.to_string(),
                discipline_style(pointer.discipline),
            ),
            Content::Object(layout) => (
                Span::styled("{ .. }", Style::default().fg(DEFAULT_THEME.comment)),
                layout.name.clone(),
                Style::default().fg(DEFAULT_THEME.type_name),
            ),
            Content::Value => (
                Span::styled("value", Style::default().fg(DEFAULT_THEME.comment)),
                String::new(),
                Style::default(),
            ),
        };

        // addr(10) + " " + name + ": " + value, type aligned to the right
        let left_width = 13 + slot.name.len() + value_span.content.len();
        let right = format!("{} B {}", slot.size, type_str);
        let padding = content_width.saturating_sub(left_width + right.len());

        all_items.push(ListItem::new(Line::from(vec![
            Span::styled(
                format!("0x{:08x} ", slot.address),
                Style::default().fg(DEFAULT_THEME.comment),
            ),
            Span::styled(slot.name.clone(), Style::default().fg(DEFAULT_THEME.fg)),
            Span::raw(": "),
            value_span,
            Span::raw(" ".repeat(padding)),
            Span::styled(
                format!("{} B ", slot.size),
                Style::default().fg(DEFAULT_THEME.primary),
            ),
            Span::styled(type_str, type_style),
        ])));

        if let Some(layout) = slot.class_layout() {
            for member in &layout.members {
                all_items.push(ListItem::new(Line::from(vec![
                    Span::raw("    ."),
                    Span::styled(member.name.clone(), Style::default().fg(DEFAULT_THEME.fg)),
                    Span::styled(
                        format!(" {} ({} B)", member.type_name, member.size),
                        Style::default().fg(DEFAULT_THEME.comment),
                    ),
                ])));
            }
        }
    }

    let list = List::new(visible_items(all_items, area, scroll_state)).block(block);
    frame.render_widget(list, area);
}
