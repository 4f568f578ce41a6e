//! Today Plugin

use chrono::{Local, NaiveDate};

use crate::assistant::{Assistant, HandlerContext};
use crate::plugin::error::PluginResult;
use crate::plugin::traits::{CommandHandler, Plugin};

pub struct TodayPlugin;

impl Plugin for TodayPlugin {
    fn name(&self) -> &str {
        "today"
    }

    fn description(&self) -> &str {
        "Tells the current date"
    }

    fn register(&self, assistant: &mut Assistant) -> PluginResult<()> {
        assistant.add_handler(Box::new(TodayHandler));
        Ok(())
    }
}

pub fn describe_date(date: NaiveDate) -> String {
    format!("Today is {}", date.format("%A, %d %B %Y"))
}

pub struct TodayHandler;

impl CommandHandler for TodayHandler {
    fn name(&self) -> &str {
        "today"
    }

    fn can_handle(&self, input: &str) -> bool {
        matches!(input, "today" | "date" | "hôm nay" | "hôm nay là ngày mấy")
    }

    fn handle(&mut self, _input: &str, _ctx: &mut HandlerContext<'_>) -> PluginResult<String> {
        Ok(describe_date(Local::now().date_naive()))
    }

    fn command_hints(&self) -> Vec<String> {
        vec!["today".to_string(), "hôm nay".to_string()]
    }
}
