//! Helpers shared by the list-style panes

use crate::memory::{Discipline, MemoryBlock, MemoryManager};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, ListItem},
};

/// Scroll state for panes whose content grows over time
#[derive(Debug, Default)]
pub struct ScrollState {
    pub offset: usize,
    pub prev_item_count: usize,
}

/// Bordered block with the focus highlight applied
pub(crate) fn pane_block(title: &str, is_focused: bool) -> Block<'_> {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// Keep the rows that fit in `area`, scrolling to the bottom when content grew
pub(crate) fn visible_items<'a>(
    all_items: Vec<ListItem<'a>>,
    area: Rect,
    scroll_state: &mut ScrollState,
) -> Vec<ListItem<'a>> {
    let total_items = all_items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize; // Account for borders, min 1
    let max_scroll = total_items.saturating_sub(visible_height);

    // Smart auto-scroll: jump to the newest rows only when content grows
    if total_items > scroll_state.prev_item_count {
        scroll_state.offset = max_scroll;
    } else {
        scroll_state.offset = scroll_state.offset.min(max_scroll);
    }
    scroll_state.prev_item_count = total_items;

    all_items
        .into_iter()
        .skip(scroll_state.offset)
        .take(visible_height)
        .collect()
}

/// Styled description of where a pointer block points
pub(crate) fn pointer_target_span(block: &MemoryBlock, memory: &MemoryManager) -> Span<'static> {
    match block.points_to() {
        None => Span::styled("nullptr", Style::default().fg(DEFAULT_THEME.number)),
        Some(target) => match memory.block(target) {
            Some(pointee) if pointee.allocated => Span::styled(
                format!("-> 0x{:08x} ({})", pointee.address, pointee.name),
                Style::default().fg(DEFAULT_THEME.secondary),
            ),
            _ => Span::styled(
                format!("-> #{} (dangling)", target),
                Style::default()
                    .fg(DEFAULT_THEME.error)
                    .add_modifier(Modifier::BOLD),
            ),
        },
    }
}

pub(crate) fn discipline_style(discipline: Discipline) -> Style {
    match discipline {
        Discipline::Raw => Style::default().fg(DEFAULT_THEME.primary),
        Discipline::Unique => Style::default().fg(DEFAULT_THEME.unique),
        Discipline::Shared => Style::default().fg(DEFAULT_THEME.shared),
    }
}
