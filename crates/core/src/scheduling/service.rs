//! Application service tying the scheduling rules to the store ports.
//!
//! Every mutation is a read-modify-write of one reviewer document. Week input is
//! validated before the store is touched, and a failed store call is logged once
//! here and returned to the caller without a retry.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info};

use crate::domain::challenge::{ChallengeId, ChallengeSetup, SlotId};
use crate::domain::reviewer::{ExternalUserId, Reviewer, ReviewerProfile};
use crate::errors::ApplicationError;
use crate::scheduling::availability::set_availability;
use crate::scheduling::booking::set_booking;
use crate::scheduling::roster::RosterDirectory;
use crate::scheduling::schedule::{active_bookings, ScheduleView, WeekBookings};
use crate::scheduling::store::{ChallengeStore, ReviewerStore, StoreError};
use crate::scheduling::week::WeekIndex;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReviewerSchedule {
    pub reviewer: Reviewer,
    pub challenge: ChallengeSetup,
    pub view: ScheduleView,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BookingsOverview {
    pub reviewer: Reviewer,
    pub weeks: Vec<WeekBookings>,
}

pub struct SchedulingService<R, C> {
    reviewers: R,
    challenges: C,
}

impl<R, C> SchedulingService<R, C>
where
    R: ReviewerStore,
    C: ChallengeStore,
{
    pub fn new(reviewers: R, challenges: C) -> Self {
        Self { reviewers, challenges }
    }

    /// Registers the chat user as a reviewer. Registering again updates the profile
    /// and keeps the recorded schedule.
    pub async fn register_reviewer(
        &self,
        name: &str,
        external_user_id: &ExternalUserId,
        profile: ReviewerProfile,
    ) -> Result<Reviewer, ApplicationError> {
        let existing = self
            .reviewers
            .find_by_external_id(external_user_id)
            .await
            .map_err(|error| store_failure("register_reviewer", error))?;

        let reviewer = match existing {
            Some(mut reviewer) => {
                reviewer.apply_profile(profile);
                reviewer
            }
            None => Reviewer::register(name, external_user_id.clone(), profile),
        };

        let saved = self.save_reviewer("register_reviewer", reviewer).await?;
        info!(
            event_name = "scheduling.reviewer.registered",
            reviewer_id = %saved.id,
            challenge_id = %saved.challenge_id,
            bookings_per_week = saved.bookings_per_week,
            "reviewer registered"
        );
        Ok(saved)
    }

    pub async fn edit_reviewer(
        &self,
        external_user_id: &ExternalUserId,
        profile: ReviewerProfile,
    ) -> Result<Reviewer, ApplicationError> {
        let mut reviewer = self.reviewer(external_user_id).await?;
        reviewer.apply_profile(profile);
        let saved = self.save_reviewer("edit_reviewer", reviewer).await?;
        info!(
            event_name = "scheduling.reviewer.edited",
            reviewer_id = %saved.id,
            challenge_id = %saved.challenge_id,
            "reviewer profile updated"
        );
        Ok(saved)
    }

    pub async fn reviewer(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Reviewer, ApplicationError> {
        self.reviewers
            .find_by_external_id(external_user_id)
            .await
            .map_err(|error| store_failure("find_reviewer", error))?
            .ok_or_else(|| ApplicationError::NotFound {
                entity: "reviewer",
                key: external_user_id.to_string(),
            })
    }

    pub async fn challenge(&self, id: &ChallengeId) -> Result<ChallengeSetup, ApplicationError> {
        self.challenges
            .find_setup(id)
            .await
            .map_err(|error| store_failure("find_challenge", error))?
            .ok_or_else(|| ApplicationError::NotFound { entity: "challenge", key: id.to_string() })
    }

    /// Stores a challenge setup, filling an empty slot catalog with the weekday defaults.
    pub async fn save_challenge(&self, mut setup: ChallengeSetup) -> Result<ChallengeSetup, ApplicationError> {
        setup.ensure_slot_catalog();
        self.challenges
            .save_setup(setup.clone())
            .await
            .map_err(|error| store_failure("save_challenge", error))?;
        Ok(setup)
    }

    pub async fn show_availability(
        &self,
        external_user_id: &ExternalUserId,
        week: u32,
        year: i32,
    ) -> Result<ReviewerSchedule, ApplicationError> {
        let index = WeekIndex::checked(week, year)?;
        let reviewer = self.reviewer(external_user_id).await?;
        let challenge = self.challenge(&reviewer.challenge_id).await?;
        let view = ScheduleView::availability(&reviewer, &challenge, index);
        Ok(ReviewerSchedule { reviewer, challenge, view })
    }

    pub async fn show_schedule(
        &self,
        external_user_id: &ExternalUserId,
        week: u32,
        year: i32,
    ) -> Result<ReviewerSchedule, ApplicationError> {
        let index = WeekIndex::checked(week, year)?;
        let reviewer = self.reviewer(external_user_id).await?;
        let challenge = self.challenge(&reviewer.challenge_id).await?;
        let view = ScheduleView::bookings(&reviewer, &challenge, index);
        Ok(ReviewerSchedule { reviewer, challenge, view })
    }

    pub async fn show_bookings(
        &self,
        external_user_id: &ExternalUserId,
        today: NaiveDate,
    ) -> Result<BookingsOverview, ApplicationError> {
        let reviewer = self.reviewer(external_user_id).await?;
        let challenge = self.challenge(&reviewer.challenge_id).await?;
        let weeks = active_bookings(&reviewer, &challenge, today);
        Ok(BookingsOverview { reviewer, weeks })
    }

    /// Marks the reviewer (un)available for a slot and returns the refreshed
    /// availability view of that week.
    pub async fn update_availability(
        &self,
        external_user_id: &ExternalUserId,
        slot_id: &SlotId,
        week: u32,
        year: i32,
        available: bool,
    ) -> Result<ReviewerSchedule, ApplicationError> {
        let index = WeekIndex::checked(week, year)?;
        let mut reviewer = self.reviewer(external_user_id).await?;

        set_availability(&mut reviewer, slot_id, index, available);
        let reviewer = self.save_reviewer("update_availability", reviewer).await?;
        info!(
            event_name = "scheduling.availability.updated",
            reviewer_id = %reviewer.id,
            week_index = %index,
            slot_id = %slot_id,
            available,
            "availability updated"
        );

        let challenge = self.challenge(&reviewer.challenge_id).await?;
        let view = ScheduleView::availability(&reviewer, &challenge, index);
        Ok(ReviewerSchedule { reviewer, challenge, view })
    }

    /// Books or releases a slot for the reviewer identified by `external_user_id`.
    pub async fn update_booking(
        &self,
        external_user_id: &ExternalUserId,
        slot_id: &SlotId,
        week: u32,
        year: i32,
        booked: bool,
    ) -> Result<Reviewer, ApplicationError> {
        let index = WeekIndex::checked(week, year)?;
        let mut reviewer = self.reviewer(external_user_id).await?;

        if let Err(error) = set_booking(&mut reviewer, slot_id, index, booked) {
            info!(
                event_name = "scheduling.booking.rejected",
                reviewer_id = %reviewer.id,
                week_index = %index,
                slot_id = %slot_id,
                error = %error,
                "booking rejected"
            );
            return Err(error.into());
        }

        let reviewer = self.save_reviewer("update_booking", reviewer).await?;
        info!(
            event_name = "scheduling.booking.updated",
            reviewer_id = %reviewer.id,
            week_index = %index,
            slot_id = %slot_id,
            booked,
            "booking updated"
        );
        Ok(reviewer)
    }

    /// Roster Search for `challenge_id` in the given week.
    pub async fn find_available_reviewers(
        &self,
        challenge_id: &ChallengeId,
        technology_filter: &str,
        week: u32,
        year: i32,
    ) -> Result<RosterDirectory, ApplicationError> {
        let index = WeekIndex::checked(week, year)?;
        let challenge = self.challenge(challenge_id).await?;
        let roster = self
            .reviewers
            .list_for_challenge(challenge_id)
            .await
            .map_err(|error| store_failure("list_reviewers", error))?;

        let directory = RosterDirectory::build(&challenge, &roster, technology_filter, index);
        info!(
            event_name = "scheduling.roster.searched",
            challenge_id = %challenge_id,
            week_index = %index,
            technology_filter,
            roster_size = roster.len(),
            days = directory.days.len(),
            "roster search completed"
        );
        Ok(directory)
    }

    async fn save_reviewer(
        &self,
        operation: &'static str,
        reviewer: Reviewer,
    ) -> Result<Reviewer, ApplicationError> {
        self.reviewers.save(reviewer).await.map_err(|error| store_failure(operation, error))
    }
}

fn store_failure(operation: &'static str, failure: StoreError) -> ApplicationError {
    error!(
        event_name = "scheduling.store.failed",
        operation,
        error = %failure,
        "store call failed"
    );
    failure.into()
}
