//! Recurring digest schedules and their cron evaluation.

mod cron;
mod model;
mod repository;

pub use cron::CronExpression;
pub use model::{Schedule, ScheduleDraft, ScheduleId, SummaryLength};
pub use repository::ScheduleRepository;
