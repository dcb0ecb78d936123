use crate::types::timeseries::{DateWindow, ISO_DATE_FORMAT};
use polars::prelude::{col, lit, Expr, LazyFrame, StrptimeOptions};

pub trait DateWindowFrameExt {
    /// Replaces the string column `date_column` with its parsed `Date` values and keeps
    /// the rows inside `window` (inclusive on both ends).
    ///
    /// Parsing is non-strict: unparsable dates become null and the row is dropped,
    /// never an error. Nothing runs until the frame is collected.
    fn filter_window(self, date_column: &str, window: DateWindow) -> LazyFrame;
}

impl DateWindowFrameExt for LazyFrame {
    fn filter_window(self, date_column: &str, window: DateWindow) -> LazyFrame {
        let date = col(date_column);
        self.with_column(parsed_date(date_column).alias(date_column))
            .filter(
                date.clone()
                    .gt_eq(lit(window.start()))
                    .and(date.lt_eq(lit(window.end()))),
            )
    }
}

fn parsed_date(date_column: &str) -> Expr {
    col(date_column).str().to_date(StrptimeOptions {
        format: Some(ISO_DATE_FORMAT.into()),
        strict: false,
        ..Default::default()
    })
}
