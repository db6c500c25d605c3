use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Paragraph, Tabs};
use tui::{Frame, Terminal};
use tui_logger::TuiLoggerWidget;

use crate::app::{App, MenuItem};
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use chrono::Local;
use cricket_api::priority;
use cricket_api::{EventState, Innings, Match};

static TABS: &[&str; 2] = &["Matches", "Scorecard"];

const HELP_TEXT: &str = "\
Matches
  h/l or ←/→   previous / next category chip
  j/k or ↓/↑   move selection
  Enter        open scorecard for the selected match
  m            load another window of older results
  r            refresh live scores now

Scorecard
  j/k          scroll
  Esc          back to matches

Global
  1 / 2        switch tab
  ?            this help (Esc to close)
  f            toggle full screen
  \"            toggle log pane
  q            quit";

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    let result = terminal.draw(|f| {
        layout.update(f.area(), app.settings.full_screen, app.state.show_logs);

        if !app.settings.full_screen {
            draw_tabs(f, layout.tab_bar, app);
        }

        match app.state.active_tab {
            MenuItem::Matches => draw_matches(f, layout.main, app),
            MenuItem::Scorecard => draw_scorecard(f, layout.main, app),
            MenuItem::Help => draw_help(f, layout.main),
        }

        if let Some(logs) = layout.logs {
            draw_logs(f, logs);
        }

        draw_loading_spinner(f, f.area(), app, loading);
    });

    if let Err(e) = result {
        log::error!("failed to draw frame: {e}");
    }
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Matches => 0,
        MenuItem::Scorecard => 1,
        MenuItem::Help => 0,
    };

    let titles: Vec<Line> = TABS.iter().map(|t| Line::from(*t)).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let help = Paragraph::new("Help: ? ")
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

fn draw_matches(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Matches ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let [chip_bar, legend, content] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1), Constraint::Fill(1)])
            .areas(inner);

    let list = &app.state.matches;
    let chip_titles: Vec<Line> = list
        .chips
        .iter()
        .map(|c| Line::from(format!("{} ({})", c.label, c.count)))
        .collect();
    f.render_widget(
        Tabs::new(chip_titles)
            .select(list.selected_chip)
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .style(Style::default().fg(Color::Gray)),
        chip_bar,
    );

    let history = if list.history_windows > 0 {
        format!("  history +{}", list.history_windows)
    } else {
        String::new()
    };
    f.render_widget(
        Paragraph::new(format!(
            "h/l=category  j/k=move  Enter=scorecard  m=older results  r=refresh{history}"
        ))
        .style(Style::default().fg(Color::DarkGray)),
        legend,
    );

    if list.rows.is_empty() {
        let msg = if let Some(err) = app.state.last_error.as_deref() {
            format!("Nothing to show:\n{err}")
        } else if list.view.is_empty() {
            "Fetching matches...".to_string()
        } else {
            "No matches in this category".to_string()
        };
        f.render_widget(
            Paragraph::new(msg)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            content,
        );
        return;
    }

    let visible = content.height.max(1) as usize;
    let offset = list.selected.saturating_sub(visible - 1);

    let lines: Vec<Line> = list
        .rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(idx, m)| match_line(m, idx == list.selected))
        .collect();

    f.render_widget(Paragraph::new(lines), content);
}

fn match_line(m: &Match, selected: bool) -> Line<'static> {
    let marker = if selected { ">" } else { " " };
    let featured = if priority::is_featured(m) { "★" } else { " " };

    let (state, state_style) = match m.event_state {
        EventState::Live => ("LIVE", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        EventState::Upcoming => ("NEXT", Style::default().fg(Color::Cyan)),
        EventState::Completed | EventState::Result => ("DONE", Style::default().fg(Color::DarkGray)),
    };

    let status = match m.event_state {
        EventState::Upcoming => m
            .start_date
            .map(|d| d.with_timezone(&Local).format("%a %d %b %H:%M").to_string())
            .unwrap_or_else(|| "TBC".to_string()),
        EventState::Live => first_non_empty(&[m.short_event_status.as_str(), m.event_status.as_str()]),
        _ => first_non_empty(&[m.event_status.as_str(), m.short_event_status.as_str()]),
    };

    let [a, b] = &m.participants;
    let score = |p: &cricket_api::Participant| {
        if p.value.is_empty() {
            p.label().to_string()
        } else {
            format!("{} {}", p.label(), p.value)
        }
    };

    let row_style = if selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{marker}{featured} ")),
        Span::styled(format!("{state:<5}"), state_style),
        Span::styled(format!("{:<28}", format!("{}  {}", score(a), score(b))), row_style),
        Span::raw(format!(" {:<10} ", m.event_format)),
        Span::styled(status, Style::default().fg(Color::Gray)),
        Span::styled(format!("  {}", m.series_name), Style::default().fg(Color::DarkGray)),
    ])
}

fn first_non_empty(candidates: &[&str]) -> String {
    candidates
        .iter()
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

fn draw_scorecard(f: &mut Frame, area: Rect, app: &App) {
    let title = if app.state.scorecard.title.is_empty() {
        " Scorecard ".to_string()
    } else {
        format!(" Scorecard: {} ", app.state.scorecard.title)
    };
    let block = default_border(Color::White).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(scorecard) = app.state.scorecard.scorecard.as_ref() else {
        let msg = if let Some(err) = app.state.last_error.as_deref() {
            format!("Load failed:\n{err}")
        } else {
            "Select a match on the Matches tab and press Enter".to_string()
        };
        f.render_widget(Paragraph::new(msg), inner);
        return;
    };

    let mut lines: Vec<Line> = Vec::new();
    for innings in &scorecard.innings {
        lines.extend(innings_lines(innings));
        lines.push(Line::from(""));
    }

    f.render_widget(
        Paragraph::new(lines).scroll((app.state.scorecard.scroll_offset, 0)),
        inner,
    );
}

fn innings_lines(innings: &Innings) -> Vec<Line<'static>> {
    let header = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(Color::DarkGray);

    let mut lines = vec![Line::from(Span::styled(
        format!(
            "{} {}/{} ({} ov)",
            innings.batting_team, innings.total, innings.wickets, innings.overs
        ),
        header,
    ))];

    lines.push(Line::from(Span::styled(
        format!("{:<24}{:<28}{:>5}{:>5}{:>4}{:>4}", "Batter", "", "R", "B", "4s", "6s"),
        dim,
    )));
    for b in &innings.batters {
        lines.push(Line::from(format!(
            "{:<24}{:<28}{:>5}{:>5}{:>4}{:>4}",
            b.name, b.dismissal, b.runs, b.balls, b.fours, b.sixes
        )));
    }

    lines.push(Line::from(Span::styled(
        format!("{:<24}{:>6}{:>4}{:>5}{:>4}", "Bowler", "O", "M", "R", "W"),
        dim,
    )));
    for b in &innings.bowlers {
        lines.push(Line::from(format!(
            "{:<24}{:>6}{:>4}{:>5}{:>4}",
            b.name, b.overs, b.maidens, b.runs, b.wickets
        )));
    }
    lines
}

fn draw_help(f: &mut Frame, area: Rect) {
    let block = default_border(Color::DarkGray).title(" Help ");
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(
        Paragraph::new(HELP_TEXT).style(Style::default().fg(Color::Gray)),
        inner,
    );
}

fn draw_logs(f: &mut Frame, area: Rect) {
    let logs = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Gray))
        .style_debug(Style::default().fg(Color::DarkGray));
    f.render_widget(logs, area);
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(11), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::app_settings::AppSettings;
    use cricket_api::{Bucket, MergedView, ViewEntry};
    use std::sync::Arc;
    use tui::backend::TestBackend;

    fn rendered(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        draw(&mut terminal, app, LoadingState::default());
        let buffer = terminal.backend().buffer().clone();
        buffer.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn matches_tab_shows_chips_and_featured_rows() {
        let mut app = App::new(AppSettings::default());
        let mut wc = Match {
            game_id: "wc".into(),
            series_name: "ICC Men's T20 World Cup".into(),
            event_state: EventState::Live,
            short_event_status: "IND need 40".into(),
            ..Default::default()
        };
        wc.participants[0].short_name = "IND".into();
        wc.participants[1].short_name = "AUS".into();
        app.on_view_published(Arc::new(MergedView {
            entries: vec![ViewEntry { source: Bucket::Live, game: wc }],
        }));

        let screen = rendered(&mut app);
        assert!(screen.contains("All (1)"));
        assert!(screen.contains("ICC (1)"));
        assert!(screen.contains("★"));
        assert!(screen.contains("IND need 40"));
    }

    #[test]
    fn selection_past_the_fold_scrolls_into_view() {
        let mut app = App::new(AppSettings::default());
        let entries = (0..30)
            .map(|i| {
                let mut m = Match { game_id: format!("g{i}"), ..Default::default() };
                m.participants[0].short_name = format!("T{i:02}");
                m.participants[1].short_name = "OPP".into();
                ViewEntry { source: Bucket::Upcoming, game: m }
            })
            .collect();
        app.on_view_published(Arc::new(MergedView { entries }));
        app.state.matches.selected = 29;

        let screen = rendered(&mut app);
        assert!(screen.contains("T29"));
        assert!(!screen.contains("T00"));
    }

    #[test]
    fn empty_scorecard_tab_prompts_for_selection() {
        let mut app = App::new(AppSettings::default());
        app.update_tab(MenuItem::Scorecard);
        assert!(rendered(&mut app).contains("press Enter"));
    }
}
