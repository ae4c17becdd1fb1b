//! Heap pane rendering with ownership and leak indicators
//!
//! Each live heap block shows its address, size and managing discipline, followed
//! by the pointers that currently refer to it. Blocks the leak detector reports
//! are flagged so the user sees the leak appear the moment its last pointer goes.

use super::utils::{discipline_style, pane_block, visible_items, ScrollState};
use crate::memory::{MemoryBlock, MemoryManager, Storage};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

/// Render the heap pane
pub fn render_heap_pane(
    frame: &mut Frame,
    area: Rect,
    memory: &MemoryManager,
    is_focused: bool,
    scroll_state: &mut ScrollState,
) {
    let block = pane_block(" Heap ", is_focused);
    let content_width = area.width.saturating_sub(2) as usize;

    let leaks = memory.detect_leaks();
    let mut allocations: Vec<&MemoryBlock> = memory.live_blocks().filter(|b| b.is_heap()).collect();
    allocations.sort_by_key(|b| b.address);

    let mut all_items = Vec::new();
    if allocations.is_empty() {
        all_items.push(
            ListItem::new("(no active allocations)")
                .style(Style::default().fg(DEFAULT_THEME.comment)),
        );
    }

    let alloc_count = allocations.len();
    for (i, allocation) in allocations.into_iter().enumerate() {
        let is_leak = leaks.contains(&allocation.id);
        let discipline = allocation.discipline();

        let ownership = match allocation.storage {
            Storage::SharedHeap { ref_count } => format!("{} (refs: {})", discipline, ref_count),
            _ => discipline.to_string(),
        };
        let type_str = allocation
            .class_layout()
            .map(|layout| layout.name.clone())
            .unwrap_or_default();

        let addr_style = if is_leak {
            Style::default()
                .fg(DEFAULT_THEME.leak)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(DEFAULT_THEME.comment)
        };

        let size_str = format!("{} bytes", allocation.size);
        // "0xADDR" is 10 chars, " | " is 3
        let left_len = 13 + size_str.len() + 3 + ownership.len();
        let padding = content_width.saturating_sub(left_len + type_str.len());

        all_items.push(ListItem::new(Line::from(vec![
            Span::styled(format!("0x{:08x}", allocation.address), addr_style),
            Span::raw(" | "),
            Span::styled(size_str, Style::default().fg(DEFAULT_THEME.primary)),
            Span::raw(" | "),
            Span::styled(ownership, discipline_style(discipline)),
            Span::raw(" ".repeat(padding)),
            Span::styled(type_str, Style::default().fg(DEFAULT_THEME.type_name)),
        ])));

        let owners: Vec<&str> = memory
            .live_blocks()
            .filter(|b| b.points_to() == Some(allocation.id))
            .map(|b| b.name.as_str())
            .collect();

        if is_leak {
            all_items.push(ListItem::new(Line::from(vec![
                Span::raw("  "),
                Span::styled(
                    " LEAK ",
                    Style::default()
                        .bg(DEFAULT_THEME.leak)
                        .fg(Color::Black)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" {} is unreachable", allocation.name),
                    Style::default().fg(DEFAULT_THEME.leak),
                ),
            ])));
        } else if !owners.is_empty() {
            all_items.push(
                ListItem::new(format!("  owned by: {}", owners.join(", ")))
                    .style(Style::default().fg(DEFAULT_THEME.comment)),
            );
        }

        if i + 1 < alloc_count {
            all_items.push(ListItem::new(""));
        }
    }

    let list = List::new(visible_items(all_items, area, scroll_state)).block(block);
    frame.render_widget(list, area);
}
