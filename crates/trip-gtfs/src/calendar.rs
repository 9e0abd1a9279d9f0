//! Service calendar: which trips operate on a given date.
//!
//! Built from `calendar` (weekday flags + validity range) and
//! `calendar_dates` (per-date additions and removals).  The timetable is
//! treated as ongoing: a service's weekday flags apply to every matching date
//! inside its `start_date..=end_date` range, and exceptions override either
//! way.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::{GtfsError, GtfsResult};
use crate::feed::GtfsFeed;

/// 1 = service added on the date, 2 = service removed.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ServiceChange {
    Added,
    Removed,
}

struct ServiceSpan {
    weekdays: [bool; 7], // Monday-first
    start:    NaiveDate,
    end:      NaiveDate,
}

/// Resolves operating services and trips for calendar dates.
pub struct ServiceCalendar {
    services:   HashMap<String, ServiceSpan>,
    /// Per-date exceptions: `date -> [(service_id, change)]`.
    exceptions: HashMap<NaiveDate, Vec<(String, ServiceChange)>>,
    /// `service_id -> [trip_id]` from the trips table.
    trips:      HashMap<String, Vec<String>>,
}

impl ServiceCalendar {
    /// Build the calendar from a loaded feed.
    pub fn from_feed(feed: &GtfsFeed) -> GtfsResult<Self> {
        let mut services = HashMap::with_capacity(feed.calendar.len());
        for c in &feed.calendar {
            services.insert(
                c.service_id.clone(),
                ServiceSpan {
                    weekdays: [
                        c.monday == 1,
                        c.tuesday == 1,
                        c.wednesday == 1,
                        c.thursday == 1,
                        c.friday == 1,
                        c.saturday == 1,
                        c.sunday == 1,
                    ],
                    start: parse_date("calendar", &c.start_date)?,
                    end:   parse_date("calendar", &c.end_date)?,
                },
            );
        }

        let mut exceptions: HashMap<NaiveDate, Vec<(String, ServiceChange)>> = HashMap::new();
        for cd in &feed.calendar_dates {
            let change = match cd.exception_type {
                1 => ServiceChange::Added,
                2 => ServiceChange::Removed,
                other => {
                    return Err(GtfsError::Invalid {
                        table:   "calendar_dates",
                        message: format!(
                            "service {:?}: exception_type {other} (expected 1 or 2)",
                            cd.service_id
                        ),
                    });
                }
            };
            exceptions
                .entry(parse_date("calendar_dates", &cd.date)?)
                .or_default()
                .push((cd.service_id.clone(), change));
        }

        let mut trips: HashMap<String, Vec<String>> = HashMap::new();
        for t in &feed.trips {
            trips.entry(t.service_id.clone()).or_default().push(t.trip_id.clone());
        }

        Ok(Self { services, exceptions, trips })
    }

    /// Service ids operating on `date`, after applying exceptions.
    pub fn services_for_date(&self, date: NaiveDate) -> Vec<&str> {
        let weekday_idx = match date.weekday() {
            Weekday::Mon => 0,
            Weekday::Tue => 1,
            Weekday::Wed => 2,
            Weekday::Thu => 3,
            Weekday::Fri => 4,
            Weekday::Sat => 5,
            Weekday::Sun => 6,
        };

        let mut active: Vec<&str> = self
            .services
            .iter()
            .filter(|(_, span)| {
                span.weekdays[weekday_idx] && span.start <= date && date <= span.end
            })
            .map(|(id, _)| id.as_str())
            .collect();

        if let Some(changes) = self.exceptions.get(&date) {
            for (service_id, change) in changes {
                match change {
                    ServiceChange::Added => {
                        if !active.contains(&service_id.as_str()) {
                            active.push(service_id);
                        }
                    }
                    ServiceChange::Removed => {
                        active.retain(|s| s != service_id);
                    }
                }
            }
        }
        active
    }

    /// Trip ids (external GTFS strings) operating on `date`.
    pub fn trips_for_date(&self, date: NaiveDate) -> Vec<&str> {
        let mut out = Vec::new();
        for service_id in self.services_for_date(date) {
            if let Some(trip_ids) = self.trips.get(service_id) {
                out.extend(trip_ids.iter().map(String::as_str));
            }
        }
        out
    }
}

fn parse_date(table: &'static str, s: &str) -> GtfsResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y%m%d").map_err(|_| GtfsError::Invalid {
        table,
        message: format!("malformed date {s:?} (expected YYYYMMDD)"),
    })
}
