//! Selection of the record whose date range covers "today".

use chrono::NaiveDate;

use crate::models::{parse_day, Scheduled};

/// Select the record whose inclusive `[start, end]` calendar-day range
/// contains `today`, or `None` if nothing matches.
///
/// Records whose dates fail to parse, or whose range is inverted, are
/// skipped without aborting evaluation of the rest. When several ranges
/// overlap on `today`, the shortest range wins - the narrower range is the
/// more specific claim on the day - and fetch order only breaks ties
/// between ranges of equal length.
pub fn active_record<T: Scheduled>(records: &[T], today: NaiveDate) -> Option<&T> {
    let mut best: Option<(&T, i64)> = None;

    for record in records {
        let (Some(start), Some(end)) = (parse_day(record.start_date()), parse_day(record.end_date()))
        else {
            continue;
        };
        if start > end {
            continue;
        }
        if start <= today && today <= end {
            let span = (end - start).num_days();
            match best {
                Some((_, best_span)) if span >= best_span => {}
                _ => best = Some((record, span)),
            }
        }
    }

    best.map(|(record, _)| record)
}
