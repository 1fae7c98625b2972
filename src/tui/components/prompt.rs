//! # Prompt Component
//!
//! Modal list shown while the terminal platform is waiting on the user to
//! answer an activity or permission request. Owns only the highlighted row;
//! the prompt itself is a prop.

use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Clear, Paragraph};

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;
use crate::tui::platform::PlatformPrompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptEvent {
    Choose(usize),
    Dismiss,
}

#[derive(Debug, Default)]
pub struct PromptState {
    pub selected: usize,
    pub option_count: usize,
}

impl PromptState {
    pub fn reset(&mut self, option_count: usize) {
        self.selected = 0;
        self.option_count = option_count;
    }
}

impl EventHandler for PromptState {
    type Event = PromptEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<PromptEvent> {
        if self.option_count == 0 {
            return Some(PromptEvent::Dismiss);
        }
        match event {
            TuiEvent::Up => {
                self.selected = self.selected.checked_sub(1).unwrap_or(self.option_count - 1);
                None
            }
            TuiEvent::Down => {
                self.selected = (self.selected + 1) % self.option_count;
                None
            }
            TuiEvent::Open => Some(PromptEvent::Choose(self.selected)),
            TuiEvent::Back => Some(PromptEvent::Dismiss),
            _ => None,
        }
    }
}

pub struct PromptDialog<'a> {
    pub prompt: &'a PlatformPrompt,
    pub selected: usize,
}

impl Component for PromptDialog<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let options = self.prompt.options();
        let height = options.len() as u16 + 2;
        let [row] = Layout::vertical([Constraint::Length(height)])
            .flex(Flex::Center)
            .areas(area);
        let [popup] = Layout::horizontal([Constraint::Percentage(50)])
            .flex(Flex::Center)
            .areas(row);

        let lines: Vec<Line> = options
            .into_iter()
            .enumerate()
            .map(|(index, option)| {
                if index == self.selected {
                    Line::styled(
                        format!("> {option}"),
                        Style::default().add_modifier(Modifier::REVERSED),
                    )
                } else {
                    Line::raw(format!("  {option}"))
                }
            })
            .collect();

        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines).block(Block::bordered().title(self.prompt.title())),
            popup,
        );
    }
}
