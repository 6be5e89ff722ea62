use serde::Serialize;
use slotbook_core::domain::challenge::SlotId;
use slotbook_core::domain::reviewer::ExternalUserId;
use slotbook_core::errors::ApplicationError;
use slotbook_core::scheduling::WeekIndex;

use crate::commands::{open_scheduling, to_data, CommandResult};

const COMMAND: &str = "schedule";

#[derive(Debug, Serialize)]
struct ScheduleReport<'a> {
    reviewer_id: &'a str,
    name: &'a str,
    challenge_id: &'a str,
    week_index: WeekIndex,
    booking_cap: u32,
    available: Vec<&'a SlotId>,
    booked: Vec<&'a SlotId>,
}

pub fn run(user: &str, week: u32, year: i32) -> CommandResult {
    let (runtime, service) = match open_scheduling(COMMAND) {
        Ok(opened) => opened,
        Err(result) => return result,
    };

    let external_user_id = ExternalUserId(user.trim().to_string());
    let views = runtime.block_on(async {
        let availability = service.show_availability(&external_user_id, week, year).await?;
        let bookings = service.show_schedule(&external_user_id, week, year).await?;
        Ok::<_, ApplicationError>((availability, bookings))
    });
    let (availability, bookings) = match views {
        Ok(views) => views,
        Err(error) => return CommandResult::scheduling_failure(COMMAND, &error),
    };

    let reviewer = &availability.reviewer;
    let report = ScheduleReport {
        reviewer_id: &reviewer.id.0,
        name: &reviewer.name,
        challenge_id: &reviewer.challenge_id.0,
        week_index: availability.view.week_index,
        booking_cap: reviewer.booking_cap(),
        available: availability.view.selected_slot_ids(),
        booked: bookings.view.selected_slot_ids(),
    };
    let message = format!(
        "{} is available for {} and booked for {} slots in {}",
        reviewer.name,
        report.available.len(),
        report.booked.len(),
        report.week_index
    );

    match to_data(COMMAND, &report) {
        Ok(data) => CommandResult::success_with_data(COMMAND, message, Some(data)),
        Err(result) => result,
    }
}
