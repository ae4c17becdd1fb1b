//! Event log pane rendering

use super::utils::{pane_block, visible_items, ScrollState};
use crate::memory::{EventKind, EventLog};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Padding, Paragraph},
    Frame,
};

fn kind_style(kind: EventKind) -> Style {
    match kind {
        EventKind::Allocate | EventKind::Construct => Style::default().fg(DEFAULT_THEME.success),
        EventKind::Deallocate | EventKind::Destruct => Style::default().fg(DEFAULT_THEME.secondary),
        EventKind::Assign => Style::default().fg(DEFAULT_THEME.primary),
        EventKind::Copy => Style::default().fg(DEFAULT_THEME.shared),
        EventKind::Move => Style::default().fg(DEFAULT_THEME.unique),
        EventKind::Leak => Style::default()
            .fg(DEFAULT_THEME.leak)
            .add_modifier(Modifier::BOLD),
    }
}

/// Render the memory event log, oldest first
pub fn render_events_pane(
    frame: &mut Frame,
    area: Rect,
    events: &EventLog,
    is_focused: bool,
    scroll_state: &mut ScrollState,
) {
    let block = pane_block(" Memory Events ", is_focused);

    if events.is_empty() {
        let paragraph = Paragraph::new("(no events)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let all_items: Vec<ListItem> = events
        .iter()
        .map(|event| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:>4} ", event.timestamp),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
                Span::styled(format!("{:<6}", event.kind.to_string()), kind_style(event.kind)),
                Span::styled(
                    event.description.clone(),
                    Style::default().fg(DEFAULT_THEME.fg),
                ),
            ]))
        })
        .collect();

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let list = List::new(visible_items(all_items, area, scroll_state)).block(block);
    frame.render_widget(list, area);
}
