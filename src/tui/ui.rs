use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};

use crate::core::controller::Controller;
use crate::core::navigator::Navigator;
use crate::core::router::RouterKey;
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{PromptDialog, TitleBar};
use crate::tui::platform::PlatformPrompt;
use crate::tui::screens::{DemoPage, DemoScreen, HOME_ITEMS, LEFT_CONTAINER, RIGHT_CONTAINER};

const HELP: &str =
    "↑↓ move  Enter open  Esc back  Tab focus  t root  s save  c recreate  x reset  q quit";

pub fn draw_ui(
    frame: &mut Frame,
    nav: &Navigator,
    tui: &TuiState,
    prompt: Option<&PlatformPrompt>,
) {
    use Constraint::{Length, Min};
    let layout = Layout::vertical([Length(1), Min(0), Length(1)]);
    let [title_area, main_area, help_area] = layout.areas(frame.area());

    let breadcrumb = nav
        .router(&tui.main)
        .map(|router| {
            router
                .backstack()
                .entries()
                .iter()
                .map(|entry| entry.tag().unwrap_or("?").to_string())
                .collect()
        })
        .unwrap_or_default();
    TitleBar::new(breadcrumb, tui.status_message.clone(), nav.has_pending_changes())
        .render(frame, title_area);

    draw_router(frame, nav, &tui.main, main_area, true);

    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().add_modifier(Modifier::DIM)),
        help_area,
    );

    if let Some(prompt) = prompt {
        PromptDialog {
            prompt,
            selected: tui.prompt.selected,
        }
        .render(frame, main_area);
    }
}

/// Draws every view mounted in `key`'s container, bottom to top, each
/// shifted right by its translation.
fn draw_router(frame: &mut Frame, nav: &Navigator, key: &RouterKey, area: Rect, focused: bool) {
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    let Some(router) = nav.router(key) else {
        return;
    };
    let block = Block::bordered()
        .title(format!(" {} ({}) ", key.container(), router.backstack_size()))
        .border_style(border);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(container) = router.container() else {
        return;
    };
    for view in container.views() {
        let Some(controller) = nav.controller_for_view(*view) else {
            continue;
        };
        let Some(screen) = controller.screen_as::<DemoScreen>() else {
            continue;
        };
        let shift = (inner.width as f32 * container.translation(*view)).round() as u16;
        if shift >= inner.width {
            continue;
        }
        let slot = Rect {
            x: inner.x + shift,
            width: inner.width - shift,
            ..inner
        };
        draw_screen(frame, nav, controller, screen, slot, focused);
    }
}

fn draw_screen(
    frame: &mut Frame,
    nav: &Navigator,
    controller: &Controller,
    screen: &DemoScreen,
    area: Rect,
    focused: bool,
) {
    match screen.page() {
        DemoPage::Home => {
            frame.render_widget(Clear, area);
            frame.render_widget(Paragraph::new(home_lines(screen)), area);
        }
        DemoPage::Detail { depth } => {
            frame.render_widget(Clear, area);
            let text = vec![
                Line::styled(
                    format!("Detail {depth}"),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Line::raw(""),
                Line::raw("Enter pushes another detail, t pops back to the root."),
                Line::raw(format!("Attached {} time(s).", screen.visits())),
            ];
            frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), area);
        }
        DemoPage::Parent => {
            frame.render_widget(Clear, area);
            let [header, body] =
                Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(area);
            frame.render_widget(
                Paragraph::new(
                    "Two child routers. Tab moves focus, back goes to the most recently pushed \
                     side first.",
                ),
                header,
            );
            let halves: [Rect; 2] =
                Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                    .areas(body);
            let sides = [LEFT_CONTAINER, RIGHT_CONTAINER];
            for (index, (side, half)) in sides.iter().zip(halves).enumerate() {
                if let Some(child) = nav
                    .child_routers(controller.id())
                    .into_iter()
                    .find(|router| router.key().container().as_str() == *side)
                {
                    draw_router(frame, nav, child.key(), half, focused && screen.focus() == index);
                }
            }
        }
        DemoPage::Child { side, depth } => {
            frame.render_widget(Clear, area);
            let text = vec![
                Line::styled(
                    format!("{side} #{depth}"),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Line::raw("Enter pushes here."),
            ];
            frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), area);
        }
        DemoPage::Dialog => {
            let [row] = Layout::vertical([Constraint::Length(5)])
                .flex(Flex::Center)
                .areas(area);
            let [popup] = Layout::horizontal([Constraint::Percentage(60)])
                .flex(Flex::Center)
                .areas(row);
            frame.render_widget(Clear, popup);
            frame.render_widget(
                Paragraph::new("The screen underneath is still attached.\nEnter or Esc closes.")
                    .block(Block::bordered().title(" Dialog "))
                    .wrap(Wrap { trim: true }),
                popup,
            );
        }
    }
}

fn home_lines(screen: &DemoScreen) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = HOME_ITEMS
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if index == screen.selected() {
                Line::styled(format!("> {item}"), Style::default().add_modifier(Modifier::REVERSED))
            } else {
                Line::raw(format!("  {item}"))
            }
        })
        .collect();
    lines.push(Line::raw(""));
    lines.push(Line::raw(format!(
        "color: {}",
        screen.color().unwrap_or("none picked")
    )));
    lines.push(Line::raw(format!(
        "camera: {}",
        match screen.permission() {
            Some(true) => "granted",
            Some(false) => "denied",
            None => "not asked",
        }
    )));
    lines.push(Line::raw(format!("visits: {}", screen.visits())));
    lines
}
