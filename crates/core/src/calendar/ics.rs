//! iCalendar events for the calendar watcher.
//!
//! Lexing, line unfolding and component nesting come from the `ical` crate.
//! This module turns `VEVENT`s into UTC instants: `TZID` parameters resolve
//! through `chrono-tz`, and `RRULE`s are expanded with `rrule` on demand.

use std::io::BufReader;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use ical::parser::ical::component::IcalEvent;
use ical::property::Property;
use ical::IcalParser;
use rrule::RRuleSet;
use thiserror::Error;

/// Upper bound on occurrences expanded for a single poll window.
const MAX_OCCURRENCES_PER_WINDOW: u16 = 512;

const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IcsEvent {
    pub uid: Option<String>,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub recurrence: Option<Recurrence>,
}

/// `RRULE`s of an event, anchored at its `DTSTART`, minus its `EXDATE`s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recurrence {
    rule_set: String,
    exdates: Vec<DateTime<Utc>>,
}

impl Recurrence {
    fn rule_set(&self) -> Result<RRuleSet, rrule::RRuleError> {
        self.rule_set.parse()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IcsError {
    #[error("input is not an iCalendar document (missing BEGIN:VCALENDAR)")]
    MissingCalendar,
    #[error("could not read calendar: {0}")]
    Parse(String),
    #[error("invalid {property} value `{value}`")]
    InvalidDate { property: String, value: String },
    #[error("unknown time zone `{0}`")]
    UnknownTimeZone(String),
    #[error("invalid recurrence rule `{rule}`: {message}")]
    InvalidRecurrence { rule: String, message: String },
}

impl IcsEvent {
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Start instants in `(since, until]`, ascending.
    pub fn occurrences(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let Some(recurrence) = &self.recurrence else {
            if self.start > since && self.start <= until {
                return vec![self.start];
            }
            return Vec::new();
        };
        let Ok(rule_set) = recurrence.rule_set() else {
            return Vec::new();
        };

        // Widened by a second so an occurrence exactly at `until` survives.
        rule_set
            .after(since.with_timezone(&rrule::Tz::UTC))
            .before((until + Duration::seconds(1)).with_timezone(&rrule::Tz::UTC))
            .all(MAX_OCCURRENCES_PER_WINDOW)
            .dates
            .into_iter()
            .map(|date| date.with_timezone(&Utc))
            .filter(|start| *start > since && *start <= until)
            .filter(|start| !recurrence.exdates.contains(start))
            .collect()
    }
}

/// Parses every `VEVENT` in `input`. Events without `DTSTART` are dropped.
pub fn parse_events(input: &str) -> Result<Vec<IcsEvent>, IcsError> {
    let mut events = Vec::new();
    let mut calendars = 0usize;

    for calendar in IcalParser::new(BufReader::new(input.as_bytes())) {
        let calendar = calendar.map_err(|error| IcsError::Parse(error.to_string()))?;
        calendars += 1;
        for event in &calendar.events {
            if let Some(event) = read_event(event)? {
                events.push(event);
            }
        }
    }

    if calendars == 0 {
        return Err(IcsError::MissingCalendar);
    }
    Ok(events)
}

/// A resolved `DTSTART`/`DTEND`/`EXDATE` value.
struct EventTime {
    utc: DateTime<Utc>,
    all_day: bool,
    zone: Option<(String, NaiveDateTime)>,
}

impl EventTime {
    fn rrule_anchor(&self) -> String {
        match &self.zone {
            Some((tzid, local)) => {
                format!("DTSTART;TZID={tzid}:{}", local.format(DATE_TIME_FORMAT))
            }
            None => format!("DTSTART:{}Z", self.utc.format(DATE_TIME_FORMAT)),
        }
    }
}

fn read_event(event: &IcalEvent) -> Result<Option<IcsEvent>, IcsError> {
    let Some(start) = find(&event.properties, "DTSTART") else {
        return Ok(None);
    };
    let start = parse_time(start, start.value.as_deref().unwrap_or_default())?;
    let end = find(&event.properties, "DTEND")
        .map(|end| parse_time(end, end.value.as_deref().unwrap_or_default()))
        .transpose()?
        .map(|end| end.utc);

    let rules: Vec<&str> = named(&event.properties, "RRULE")
        .filter_map(|property| property.value.as_deref())
        .collect();
    let recurrence = if rules.is_empty() {
        None
    } else {
        let mut exdates = Vec::new();
        for property in named(&event.properties, "EXDATE") {
            for value in property.value.as_deref().unwrap_or_default().split(',') {
                exdates.push(parse_time(property, value)?.utc);
            }
        }

        let mut rule_set = start.rrule_anchor();
        for rule in &rules {
            rule_set.push_str("\nRRULE:");
            rule_set.push_str(rule);
        }
        let recurrence = Recurrence { rule_set, exdates };
        recurrence.rule_set().map_err(|error| IcsError::InvalidRecurrence {
            rule: rules.join(" / "),
            message: error.to_string(),
        })?;
        Some(recurrence)
    };

    Ok(Some(IcsEvent {
        uid: text(&event.properties, "UID"),
        summary: text(&event.properties, "SUMMARY").unwrap_or_default(),
        description: text(&event.properties, "DESCRIPTION"),
        location: text(&event.properties, "LOCATION"),
        start: start.utc,
        end,
        all_day: start.all_day,
        recurrence,
    }))
}

fn named<'a>(properties: &'a [Property], name: &'a str) -> impl Iterator<Item = &'a Property> {
    properties.iter().filter(move |property| property.name.eq_ignore_ascii_case(name))
}

fn find<'a>(properties: &'a [Property], name: &'a str) -> Option<&'a Property> {
    named(properties, name).next()
}

fn text(properties: &[Property], name: &str) -> Option<String> {
    find(properties, name).and_then(|property| property.value.as_deref()).map(unescape_text)
}

fn param<'a>(property: &'a Property, key: &str) -> Option<&'a str> {
    property
        .params
        .as_ref()?
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .and_then(|(_, values)| values.first())
        .map(|value| value.trim_matches('"'))
}

fn parse_time(property: &Property, value: &str) -> Result<EventTime, IcsError> {
    let value = value.trim();
    let invalid =
        || IcsError::InvalidDate { property: property.name.clone(), value: value.to_owned() };

    let date_only = param(property, "VALUE").is_some_and(|kind| kind.eq_ignore_ascii_case("DATE"))
        || (value.len() == 8 && value.bytes().all(|byte| byte.is_ascii_digit()));
    if date_only {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|_| invalid())?;
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        return Ok(EventTime { utc: Utc.from_utc_datetime(&midnight), all_day: true, zone: None });
    }

    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, DATE_TIME_FORMAT).map_err(|_| invalid())?;
        return Ok(EventTime { utc: Utc.from_utc_datetime(&naive), all_day: false, zone: None });
    }

    let naive = NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT).map_err(|_| invalid())?;
    let Some(tzid) = param(property, "TZID") else {
        // Floating time.
        return Ok(EventTime { utc: Utc.from_utc_datetime(&naive), all_day: false, zone: None });
    };
    let zone: Tz = tzid.parse().map_err(|_| IcsError::UnknownTimeZone(tzid.to_owned()))?;
    let utc = resolve_local(zone, &naive).ok_or_else(invalid)?;

    Ok(EventTime { utc, all_day: false, zone: Some((tzid.to_owned(), naive)) })
}

/// Ambiguous local times take the earlier instant; times skipped by a DST
/// gap move forward by an hour.
fn resolve_local(zone: Tz, local: &NaiveDateTime) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(local)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(*local + Duration::hours(1))).earliest())
        .map(|resolved| resolved.with_timezone(&Utc))
}

fn unescape_text(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => output.push('\n'),
            Some(other) => output.push(other),
            None => output.push('\\'),
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::{parse_events, IcsError};

    const STANDUP: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:standup-1\r\n\
SUMMARY:Daily Standup\\, Team A\r\n\
DTSTART:20261019T090000Z\r\n\
DTEND:20261019T091500Z\r\n\
DESCRIPTION:Line one\\nli\r\n ne two\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
SUMMARY:ignored alarm\r\n\
TRIGGER:-PT5M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, hour, minute, 0).unwrap()
    }

    fn calendar(event_lines: &str) -> String {
        format!("BEGIN:VCALENDAR\nBEGIN:VEVENT\n{event_lines}END:VEVENT\nEND:VCALENDAR\n")
    }

    #[test]
    fn reads_utc_event_with_folded_and_escaped_text() {
        let events = parse_events(STANDUP).expect("parse");

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.uid.as_deref(), Some("standup-1"));
        assert_eq!(event.summary, "Daily Standup, Team A");
        assert_eq!(event.description.as_deref(), Some("Line one\nline two"));
        assert_eq!(event.start, at(19, 9, 0));
        assert_eq!(event.end, Some(at(19, 9, 15)));
        assert!(!event.all_day);
        assert!(!event.is_recurring());
    }

    #[test]
    fn all_day_dates_start_at_midnight_utc() {
        let input = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\n\
SUMMARY:Release day\n\
DTSTART;VALUE=DATE:20261020\n\
END:VEVENT\n\
BEGIN:VEVENT\n\
SUMMARY:Offsite\n\
DTSTART:20261022\n\
END:VEVENT\n\
END:VCALENDAR\n";

        let events = parse_events(input).expect("parse");

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| event.all_day));
        assert_eq!(events[0].start, at(20, 0, 0));
        assert_eq!(events[1].start, at(22, 0, 0));
    }

    #[test]
    fn tzid_local_times_resolve_to_utc() {
        let events = parse_events(&calendar(
            "SUMMARY:Retro\nDTSTART;TZID=Europe/Berlin:20261021T140000\n\
DTEND;TZID=\"Europe/Berlin\":20261021T150000\n",
        ))
        .expect("parse");

        assert_eq!(events[0].start, at(21, 12, 0));
        assert_eq!(events[0].end, Some(at(21, 13, 0)));
        assert!(!events[0].all_day);
    }

    #[test]
    fn floating_times_are_read_as_utc() {
        let events = parse_events(&calendar("DTSTART:20261021T140000\n")).expect("parse");

        assert_eq!(events[0].start, at(21, 14, 0));
    }

    #[test]
    fn unknown_tzid_is_rejected() {
        let input = calendar("DTSTART;TZID=Mars/Olympus:20261021T140000\n");

        assert_eq!(
            parse_events(&input),
            Err(IcsError::UnknownTimeZone("Mars/Olympus".to_owned()))
        );
    }

    #[test]
    fn daily_rule_fires_every_morning() {
        let events = parse_events(&calendar(
            "SUMMARY:Standup\nDTSTART:20261001T090000Z\nRRULE:FREQ=DAILY\n",
        ))
        .expect("parse");
        let event = &events[0];

        assert!(event.is_recurring());
        assert_eq!(event.occurrences(at(19, 8, 59), at(19, 9, 1)), vec![at(19, 9, 0)]);
        assert!(event.occurrences(at(19, 9, 0), at(19, 9, 1)).is_empty());
        assert_eq!(event.occurrences(at(18, 9, 0), at(19, 9, 0)), vec![at(19, 9, 0)]);
    }

    #[test]
    fn zoned_weekly_rule_follows_daylight_saving() {
        let events = parse_events(&calendar(
            "DTSTART;TZID=Europe/Berlin:20261020T100000\nRRULE:FREQ=WEEKLY;COUNT=3\n",
        ))
        .expect("parse");

        assert_eq!(
            events[0].occurrences(at(19, 0, 0), at(31, 0, 0)),
            vec![at(20, 8, 0), at(27, 9, 0)]
        );
    }

    #[test]
    fn exdates_are_skipped() {
        let events = parse_events(&calendar(
            "DTSTART:20261001T090000Z\nRRULE:FREQ=DAILY;COUNT=5\nEXDATE:20261002T090000Z\n",
        ))
        .expect("parse");

        assert_eq!(
            events[0].occurrences(at(1, 0, 0), at(10, 0, 0)),
            vec![at(1, 9, 0), at(3, 9, 0), at(4, 9, 0), at(5, 9, 0)]
        );
    }

    #[test]
    fn invalid_rule_is_rejected() {
        let input = calendar("DTSTART:20261001T090000Z\nRRULE:FREQ=SOMETIMES\n");

        assert!(matches!(parse_events(&input), Err(IcsError::InvalidRecurrence { .. })));
    }

    #[test]
    fn events_without_start_are_dropped() {
        assert!(parse_events(&calendar("SUMMARY:No time\n")).expect("parse").is_empty());
    }

    #[test]
    fn rejects_unterminated_event() {
        let input = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nSUMMARY:Open\n";

        assert!(matches!(parse_events(input), Err(IcsError::Parse(_))));
    }

    #[test]
    fn rejects_event_closed_inside_alarm() {
        let input = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\n\
DTSTART:20261019T090000Z\n\
BEGIN:VALARM\n\
TRIGGER:-PT5M\n\
END:VEVENT\n\
END:VCALENDAR\n";

        assert!(matches!(parse_events(input), Err(IcsError::Parse(_))));
    }

    #[test]
    fn rejects_malformed_content_line() {
        let input = calendar("DTSTART:20261019T090000Z\nthis line has no separator\n");

        assert!(matches!(parse_events(&input), Err(IcsError::Parse(_))));
    }

    #[test]
    fn rejects_invalid_start() {
        let input = calendar("DTSTART:tomorrow\n");

        assert!(matches!(
            parse_events(&input),
            Err(IcsError::InvalidDate { ref property, ref value })
                if property == "DTSTART" && value == "tomorrow"
        ));
    }

    #[test]
    fn rejects_non_calendar_input() {
        assert!(parse_events("hello: world\n").is_err());
        assert_eq!(parse_events(""), Err(IcsError::MissingCalendar));
    }
}
