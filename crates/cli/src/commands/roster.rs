use slotbook_core::domain::challenge::ChallengeId;

use crate::commands::{open_scheduling, to_data, CommandResult};

const COMMAND: &str = "roster";

pub fn run(challenge: &str, week: u32, year: i32, technology_filter: &str) -> CommandResult {
    let (runtime, service) = match open_scheduling(COMMAND) {
        Ok(opened) => opened,
        Err(result) => return result,
    };

    let challenge_id = ChallengeId(challenge.trim().to_string());
    let directory = match runtime.block_on(service.find_available_reviewers(
        &challenge_id,
        technology_filter.trim(),
        week,
        year,
    )) {
        Ok(directory) => directory,
        Err(error) => return CommandResult::scheduling_failure(COMMAND, &error),
    };

    let message = if directory.is_empty() {
        format!("no reviewers available for `{challenge_id}` in week {week}-{year}")
    } else {
        let slots = directory.days.values().map(|slots| slots.len()).sum::<usize>();
        format!(
            "{} days and {slots} slots have reviewers for `{challenge_id}` in week {week}-{year}",
            directory.days.len()
        )
    };

    match to_data(COMMAND, &directory) {
        Ok(data) => CommandResult::success_with_data(COMMAND, message, Some(data)),
        Err(result) => result,
    }
}
