pub mod colors;
pub mod dates;
pub mod league;
pub mod payment;
pub mod report;
pub mod sanction;
pub mod schedule;

pub use colors::{division_color, division_color_hex};
pub use dates::{DateRange, format_calendar_date, parse_calendar_date};
pub use league::*;
pub use payment::{PaymentAmountError, validate_payment_amount};
pub use report::{
    PeriodReport, ReportSettings, TeamPeriodRow, is_payment_in_date_range, is_week_in_date_range,
    summarize_period,
};
pub use sanction::{PlayerKey, sanction_paid_set, unpaid_sanction_players};
pub use schedule::{WeekStatus, calendar_and_due_week, play_date_for_week, play_dates};
