use serde::Serialize;
use slotbook_core::domain::challenge::Slot;
use slotbook_core::domain::reviewer::{ExternalUserId, Reviewer};
use slotbook_core::errors::InterfaceError;
use slotbook_core::scheduling::roster::RosterDirectory;
use slotbook_core::scheduling::service::{BookingsOverview, ReviewerSchedule};
use slotbook_core::scheduling::week::{WeekIndex, WeekOption};

use crate::actions::{encode_week_option, ActionKind, ScheduleAction, ToggleButton};

pub const WEEK_PICKER_ACTION_PREFIX: &str = "week_picker:";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn text_content(&self) -> &str {
        self.text.text()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub text: TextObject,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StaticSelectElement {
    pub action_id: String,
    pub placeholder: TextObject,
    pub options: Vec<SelectOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_option: Option<SelectOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockElement {
    Button(ButtonElement),
    StaticSelect(StaticSelectElement),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        block_id: String,
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<BlockElement>,
    },
    Actions {
        block_id: String,
        elements: Vec<BlockElement>,
    },
    Context {
        block_id: String,
        elements: Vec<TextObject>,
    },
}

impl Block {
    pub fn block_id(&self) -> &str {
        match self {
            Self::Section { block_id, .. }
            | Self::Actions { block_id, .. }
            | Self::Context { block_id, .. } => block_id,
        }
    }
}

/// A message as posted to a `response_url`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    #[serde(rename = "text")]
    pub fallback_text: String,
    pub blocks: Vec<Block>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub replace_original: bool,
}

impl MessageTemplate {
    pub fn replacing_original(mut self) -> Self {
        self.replace_original = true;
        self
    }

    pub fn buttons(&self) -> Vec<&ButtonElement> {
        self.blocks
            .iter()
            .flat_map(|block| match block {
                Block::Section { accessory: Some(BlockElement::Button(button)), .. } => {
                    vec![button]
                }
                Block::Actions { elements, .. } => elements
                    .iter()
                    .filter_map(|element| match element {
                        BlockElement::Button(button) => Some(button),
                        BlockElement::StaticSelect(_) => None,
                    })
                    .collect(),
                _ => Vec::new(),
            })
            .collect()
    }
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        let (text, accessory) = builder.build();
        self.blocks.push(Block::Section { block_id: block_id.into(), text, accessory });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            fallback_text: self.fallback_text,
            blocks: self.blocks,
            replace_original: false,
        }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
    accessory: Option<BlockElement>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.accessory = Some(BlockElement::Button(button));
        self
    }

    fn build(self) -> (TextObject, Option<BlockElement>) {
        (self.text.unwrap_or_else(|| TextObject::plain("")), self.accessory)
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<BlockElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(BlockElement::Button(button));
        self
    }

    pub fn static_select(&mut self, select: StaticSelectElement) -> &mut Self {
        self.elements.push(BlockElement::StaticSelect(select));
        self
    }

    fn build(self) -> Vec<BlockElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("reviewer.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("reviewer.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

/// Renders a failure for the end user. Details are shown for errors caused by the
/// request itself; store and internal failures only show the generic message.
pub fn interface_error_message(error: &InterfaceError) -> MessageTemplate {
    let summary = match error {
        InterfaceError::BadRequest { message, .. }
        | InterfaceError::BookingLimit { message, .. }
        | InterfaceError::NotFound { message, .. } => {
            format!("{} ({message})", error.user_message())
        }
        InterfaceError::Conflict { .. }
        | InterfaceError::ServiceUnavailable { .. }
        | InterfaceError::Internal { .. } => error.user_message().to_owned(),
    };
    error_message(&summary, error.correlation_id())
}

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new("Reviewer command help")
        .section("reviewer.help.summary.v1", |section| {
            section.mrkdwn(
                "Hello and welcome to the coding challenge tool. You can use the following commands:\n\
                 • `/reviewer help` : Displays this message\n\
                 • `/reviewer new [@SLACKID] <challenge> <github alias> <bookings per week> <technologies>` : Registers a reviewer\n\
                 • `/reviewer edit [@SLACKID] <challenge> <github alias> <bookings per week> <technologies>` : Updates a reviewer\n\
                 • `/reviewer schedule [@SLACKID] [week-year]` : Sets up a reviewer schedule for all weeks or a specific week\n\
                 • `/reviewer bookings [@SLACKID] [week-year]` : Shows active bookings, or the bookings of one week\n\
                 • `/reviewer find <challenge> [week-year] [technology]` : Finds reviewers and books them\n\
                 If SLACKID is omitted, you are assumed to be the reviewer.",
            );
        })
        .build()
}

pub fn reviewer_saved_message(reviewer: &Reviewer, created: bool) -> MessageTemplate {
    let verb = if created { "created" } else { "updated" };
    let summary = format!(
        "We {verb} a reviewer named {} in our database. They will be reviewing: {}, and their Github alias is: {}",
        reviewer.name, reviewer.challenge_id, reviewer.github_alias
    );
    MessageBuilder::new(summary.clone())
        .section("reviewer.profile.summary.v1", |section| {
            section.mrkdwn(summary);
        })
        .context("reviewer.profile.context.v1", |context| {
            context.mrkdwn(format!(
                "*<@{}>* · {} · max {} booking(s)/week",
                reviewer.external_user_id,
                display_technologies(&reviewer.technology_list),
                reviewer.booking_cap()
            ));
        })
        .build()
}

/// Week picker for the availability editor of `reviewer`.
pub fn week_picker_message(reviewer: &ExternalUserId, options: &[WeekOption]) -> MessageTemplate {
    let select_options = options
        .iter()
        .map(|option| SelectOption {
            text: TextObject::plain(option.label.clone()),
            value: encode_week_option(option.week, option.year),
        })
        .collect::<Vec<_>>();
    let initial_option = select_options.first().cloned();

    MessageBuilder::new(format!("Pick a week to update the schedule of {reviewer}"))
        .section("reviewer.week_picker.header.v1", |section| {
            section.mrkdwn(format!("*Update Schedule* for <@{reviewer}>: pick a week of the year"));
        })
        .actions("reviewer.week_picker.select.v1", |actions| {
            actions.static_select(StaticSelectElement {
                action_id: format!("{WEEK_PICKER_ACTION_PREFIX}{reviewer}"),
                placeholder: TextObject::plain("Week of the Year"),
                options: select_options,
                initial_option,
            });
        })
        .build()
}

/// Availability editor: one toggle per catalog slot for the viewed week.
pub fn schedule_message(schedule: &ReviewerSchedule, fallback_year: i32) -> MessageTemplate {
    let (week, year) = schedule.view.week_index.week_and_year(fallback_year);
    let header = format!("{} schedule for {}", schedule.reviewer.name, week_title(week, year));
    let reviewer = &schedule.reviewer.external_user_id;

    MessageBuilder::new(header.clone())
        .section("reviewer.schedule.header.v1", |section| {
            section.mrkdwn(format!("*{header}*"));
        })
        .actions("reviewer.schedule.slots.v1", |actions| {
            for entry in &schedule.view.entries {
                let action = ScheduleAction::new(
                    ActionKind::ScheduleUpdate,
                    entry.slot.id.clone(),
                    reviewer.clone(),
                    week,
                    year,
                );
                actions.button(ToggleButton::new(action, entry.is_selected).render(&entry.slot));
            }
        })
        .build()
}

/// Bookings of one week, each with an unbook button.
pub fn week_bookings_message(schedule: &ReviewerSchedule, fallback_year: i32) -> MessageTemplate {
    let (week, year) = schedule.view.week_index.week_and_year(fallback_year);
    let reviewer = &schedule.reviewer;
    let title = week_title(week, year);
    let booked = schedule.view.entries.iter().filter(|entry| entry.is_selected).collect::<Vec<_>>();

    let mut builder = MessageBuilder::new(format!("Bookings of {} for {title}", reviewer.name))
        .section("reviewer.week_bookings.header.v1", |section| {
            section.mrkdwn(format!(
                "Bookings for *<@{}>* ({}) in {title}",
                reviewer.external_user_id,
                display_technologies(&reviewer.technology_list)
            ));
        });

    if booked.is_empty() {
        return builder
            .section("reviewer.week_bookings.empty.v1", |section| {
                section.mrkdwn("No bookings found.");
            })
            .build();
    }

    for entry in booked {
        builder = booking_section(builder, reviewer, &entry.slot, week, year);
    }
    builder.build()
}

pub fn bookings_message(overview: &BookingsOverview) -> MessageTemplate {
    let reviewer = &overview.reviewer;
    let mut builder = MessageBuilder::new(format!("All bookings for {}", reviewer.name)).section(
        "reviewer.bookings.header.v1",
        |section| {
            section.mrkdwn(format!(
                "All bookings for *<@{}>* ({})",
                reviewer.external_user_id,
                display_technologies(&reviewer.technology_list)
            ));
        },
    );

    if overview.weeks.is_empty() {
        return builder
            .section("reviewer.bookings.empty.v1", |section| {
                section.mrkdwn("No bookings found.");
            })
            .build();
    }

    for week_bookings in &overview.weeks {
        let WeekIndex::Week { year, week } = week_bookings.week_index else {
            continue;
        };
        builder = builder.section(format!("reviewer.bookings.week.{week}-{year}.v1"), |section| {
            section.mrkdwn(format!("*{}*", week_bookings.label));
        });
        for slot in &week_bookings.slots {
            builder = booking_section(builder, reviewer, slot, week, year);
        }
    }
    builder.build()
}

/// Roster Search result, grouped by day and slot with a book toggle per reviewer.
pub fn roster_message(directory: &RosterDirectory, week: u32, year: i32) -> MessageTemplate {
    let title = week_title(week, year);
    let mut builder = MessageBuilder::new(format!("Interviewer list for {title}"))
        .section("reviewer.roster.header.v1", |section| {
            section.mrkdwn(format!("*Interviewer List For Week:* {title}"));
        });

    if directory.is_empty() {
        return builder
            .section("reviewer.roster.empty.v1", |section| {
                section.mrkdwn("No reviewers are available for this week.");
            })
            .build();
    }

    for (day, slots) in directory.days_in_order() {
        builder = builder.section(format!("reviewer.roster.day.{day}.v1"), |section| {
            section.mrkdwn(format!("*{day}*"));
        });
        for availability in slots {
            let slot = &availability.slot;
            builder = builder.section(format!("reviewer.roster.slot.{}.v1", slot.id), |section| {
                section.mrkdwn(format!(
                    "*Interview Slot:* {} ({} - {})",
                    slot.name, slot.start_time, slot.end_time
                ));
            });
            for entry in &availability.reviewers {
                let reviewer = &entry.reviewer;
                let action = ScheduleAction::new(
                    ActionKind::FindReviewers,
                    slot.id.clone(),
                    reviewer.external_user_id.clone(),
                    week,
                    year,
                );
                let toggle = ToggleButton::new(action, entry.is_booked);
                builder = builder.section(
                    format!("reviewer.roster.{}.{}.v1", slot.id, reviewer.external_user_id),
                    |section| {
                        section
                            .mrkdwn(format!(
                                "*<@{}|{}>* ({})",
                                reviewer.external_user_id,
                                reviewer.name,
                                display_technologies(&reviewer.technology_list)
                            ))
                            .button(toggle.render(slot));
                    },
                );
            }
        }
    }
    builder.build()
}

pub fn booking_updated_message(
    reviewer: &Reviewer,
    slot_id: &str,
    week: u32,
    year: i32,
    booked: bool,
) -> MessageTemplate {
    let verb = if booked { "Booked" } else { "Released" };
    let summary = format!(
        "{verb} <@{}> for slot {slot_id} in {}",
        reviewer.external_user_id,
        week_title(week, year)
    );
    MessageBuilder::new(summary.clone())
        .section("reviewer.booking.updated.v1", |section| {
            section.mrkdwn(summary);
        })
        .build()
}

fn booking_section(
    builder: MessageBuilder,
    reviewer: &Reviewer,
    slot: &Slot,
    week: u32,
    year: i32,
) -> MessageBuilder {
    let action = ScheduleAction::new(
        ActionKind::ShowBookings,
        slot.id.clone(),
        reviewer.external_user_id.clone(),
        week,
        year,
    );
    let toggle = ToggleButton::new(action, true);
    builder.section(format!("reviewer.bookings.slot.{}.{week}-{year}.v1", slot.id), |section| {
        section.mrkdwn(format!("*Slot*: {}", slot.name)).button(toggle.render(slot));
    })
}

fn week_title(week: u32, year: i32) -> String {
    WeekIndex::from_week(week, year).label().unwrap_or_else(|_| format!("Week # {week}"))
}

fn display_technologies(list: &str) -> &str {
    if list.trim().is_empty() {
        "no technologies listed"
    } else {
        list
    }
}
