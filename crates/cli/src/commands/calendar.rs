use std::fs;
use std::path::Path;

use prwatch_core::calendar::{parse_events, IcsEvent};
use prwatch_core::config::{AppConfig, LoadOptions};
use prwatch_core::CalendarWatcher;
use serde::Serialize;
use serde_json::json;

use super::CommandResult;

const COMMAND: &str = "calendar";

#[derive(Debug, Serialize)]
struct EventPreview {
    summary: String,
    starts_at: String,
    all_day: bool,
    recurring: bool,
    triggers: Vec<TriggerPreview>,
}

#[derive(Debug, Serialize)]
struct TriggerPreview {
    calendar: String,
    event_name: String,
    channel: String,
    commands: Vec<String>,
}

/// Lists the events in an ICS file and, when a valid configuration is
/// available, the commands each event would post.
pub fn run(path: &Path) -> CommandResult {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "io",
                format!("could not read `{}`: {error}", path.display()),
                3,
            );
        }
    };

    let mut events = match parse_events(&raw) {
        Ok(events) => events,
        Err(error) => return CommandResult::failure(COMMAND, "ics_parse", error.to_string(), 4),
    };
    events.sort_by_key(|event| event.start);

    if events.is_empty() {
        return CommandResult::success(COMMAND, format!("no events in `{}`", path.display()));
    }

    let (watchers, note) = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let watchers: Vec<CalendarWatcher> = config
                .calendars
                .iter()
                .filter_map(|calendar| CalendarWatcher::new(calendar).ok())
                .collect();
            let note = if watchers.is_empty() { Some("no calendars configured") } else { None };
            (watchers, note)
        }
        Err(_) => (Vec::new(), Some("configuration did not load; triggers not evaluated")),
    };

    let previews: Vec<EventPreview> =
        events.iter().map(|event| preview(event, &watchers)).collect();
    let triggering = previews.iter().filter(|preview| !preview.triggers.is_empty()).count();

    let mut message =
        format!("{} events parsed, {triggering} would trigger commands", events.len());
    if let Some(note) = note {
        message.push_str(&format!(" ({note})"));
    }

    CommandResult::success_with_data(COMMAND, message, Some(json!({ "events": previews })))
}

fn preview(event: &IcsEvent, watchers: &[CalendarWatcher]) -> EventPreview {
    let triggers = watchers
        .iter()
        .flat_map(|watcher| {
            watcher.matching(&event.summary).map(move |config| TriggerPreview {
                calendar: watcher.name().to_owned(),
                event_name: config.name.clone(),
                channel: config.channel.clone(),
                commands: config.commands.clone(),
            })
        })
        .collect();

    EventPreview {
        summary: event.summary.clone(),
        starts_at: event.start.to_rfc3339(),
        all_day: event.all_day,
        recurring: event.is_recurring(),
        triggers,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use prwatch_core::calendar::IcsEvent;
    use prwatch_core::{CalendarConfig, CalendarEventConfig, CalendarWatcher};

    use super::preview;

    fn event(summary: &str) -> IcsEvent {
        IcsEvent {
            uid: None,
            summary: summary.to_owned(),
            description: None,
            location: None,
            start: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("valid date"),
            end: None,
            all_day: false,
            recurrence: None,
        }
    }

    fn watcher() -> CalendarWatcher {
        CalendarWatcher::new(&CalendarConfig {
            name: "team".to_owned(),
            path: "team.ics".to_owned(),
            events: vec![CalendarEventConfig {
                name: "standup".to_owned(),
                pattern: "(?i)standup".to_owned(),
                channel: "C-TEAM".to_owned(),
                commands: vec!["help".to_owned()],
            }],
        })
        .expect("valid watcher")
    }

    #[test]
    fn preview_lists_matching_triggers() {
        let listed = preview(&event("Daily Standup"), &[watcher()]);

        assert_eq!(listed.triggers.len(), 1);
        assert_eq!(listed.triggers[0].channel, "C-TEAM");
        assert_eq!(listed.triggers[0].commands, vec!["help".to_owned()]);
        assert_eq!(listed.starts_at, "2026-03-02T09:00:00+00:00");
        assert!(!listed.recurring);
    }

    #[test]
    fn preview_without_match_has_no_triggers() {
        let listed = preview(&event("Retro"), &[watcher()]);

        assert!(listed.triggers.is_empty());
    }
}
