//! Intent handlers
//!
//! Each handler is a function of the session state and the data client,
//! returning either a reply or an escalation request. Dispatch is an
//! exhaustive match: a new `IntentType` variant will not compile until it is
//! given a disposition here.

use serde_json::json;

use driver_assist_config::{PromptCatalog, PromptKind};
use driver_assist_core::{
    ConversationState, DataClient, Error, IntentType, Language, Result, TurnResult,
};

pub(crate) const REASON_UNSUPPORTED: &str = "unsupported intent or complex query";

/// What the orchestrator should do with the handler's decision
pub(crate) enum HandlerOutcome {
    Reply(TurnResult),
    Escalate { reason: String },
}

pub(crate) async fn dispatch(
    intent: IntentType,
    state: &mut ConversationState,
    data: &dyn DataClient,
    prompts: &PromptCatalog,
) -> Result<HandlerOutcome> {
    match intent {
        IntentType::FindNearestStation => find_nearest_station(state, data, prompts).await,
        IntentType::GetSwapHistory => get_swap_history(state, data, prompts).await,
        IntentType::CheckSubscription => check_subscription(state, data).await,
        IntentType::PricingInfo => pricing_info(state, prompts),
        // Billing, availability and office lookups need tooling the bot does
        // not have; a human agent picks these up with the full summary
        IntentType::ExplainInvoice
        | IntentType::CheckAvailability
        | IntentType::RenewSubscription
        | IntentType::LeaveInfo
        | IntentType::FindDsk => Ok(HandlerOutcome::Escalate {
            reason: REASON_UNSUPPORTED.to_string(),
        }),
        IntentType::Unknown => Err(Error::Internal(
            "dispatch reached without a latched intent".to_string(),
        )),
    }
}

async fn find_nearest_station(
    state: &mut ConversationState,
    data: &dyn DataClient,
    prompts: &PromptCatalog,
) -> Result<HandlerOutcome> {
    let Some(location) = state.slot_str("location").map(String::from) else {
        let prompt = prompts.pick(
            PromptKind::AskLocation,
            state.language.code(),
            &state.conversation_id,
            state.history.len() as u32,
        );
        return Ok(HandlerOutcome::Reply(TurnResult::reply(prompt)));
    };

    let station = data.find_nearest_station(&location).await?;
    state.current_intent = None;

    let reply = match state.language {
        Language::En => format!(
            "The nearest station is {} at {}.",
            station.name, station.address
        ),
        Language::Hi => format!(
            "सबसे नज़दीकी station {} है, {} पर।",
            station.name, station.address
        ),
    };
    Ok(HandlerOutcome::Reply(
        TurnResult::ending(reply).with_data(json!({ "station": station })),
    ))
}

async fn get_swap_history(
    state: &mut ConversationState,
    data: &dyn DataClient,
    prompts: &PromptCatalog,
) -> Result<HandlerOutcome> {
    let Some(date_range) = state.slot_str("date_range").map(String::from) else {
        let prompt = prompts.pick(
            PromptKind::AskDateRange,
            state.language.code(),
            &state.conversation_id,
            state.history.len() as u32,
        );
        return Ok(HandlerOutcome::Reply(TurnResult::reply(prompt)));
    };

    let driver_id = state
        .driver_id
        .clone()
        .unwrap_or_else(|| "anonymous".to_string());
    let history = data.get_swap_history(&driver_id, &date_range).await?;
    state.current_intent = None;

    let reply = match history.iter().max_by_key(|r| r.occurred_at) {
        Some(latest) => {
            let count = history.len();
            match state.language {
                Language::En => {
                    let noun = if count == 1 { "swap" } else { "swaps" };
                    format!(
                        "I found {count} {noun} for {date_range}; the most recent was at {}.",
                        latest.spoken_time()
                    )
                }
                Language::Hi => format!(
                    "{date_range} के लिए {count} swap मिले, आखिरी {} पर।",
                    latest.spoken_time()
                ),
            }
        }
        None => match state.language {
            Language::En => format!("I found no swaps for {date_range}."),
            Language::Hi => format!("{date_range} के लिए कोई swap नहीं मिला।"),
        },
    };

    Ok(HandlerOutcome::Reply(
        TurnResult::ending(reply).with_data(json!({ "swaps": history })),
    ))
}

async fn check_subscription(
    state: &mut ConversationState,
    data: &dyn DataClient,
) -> Result<HandlerOutcome> {
    let driver_id = state
        .driver_id
        .clone()
        .unwrap_or_else(|| "anonymous".to_string());
    let subscription = data.check_subscription(&driver_id).await?;
    state.current_intent = None;

    use driver_assist_core::SubscriptionStatus;
    let reply = match (state.language, subscription.status) {
        (Language::En, SubscriptionStatus::Active) => format!(
            "Your subscription is active until {}.",
            subscription.expires_on
        ),
        (Language::En, SubscriptionStatus::Expired) => format!(
            "Your subscription expired on {}.",
            subscription.expires_on
        ),
        (Language::Hi, SubscriptionStatus::Active) => format!(
            "आपकी subscription {} तक active है।",
            subscription.expires_on
        ),
        (Language::Hi, SubscriptionStatus::Expired) => format!(
            "आपकी subscription {} को expire हो गई।",
            subscription.expires_on
        ),
    };

    Ok(HandlerOutcome::Reply(
        TurnResult::ending(reply).with_data(json!({ "subscription": subscription })),
    ))
}

fn pricing_info(
    state: &mut ConversationState,
    prompts: &PromptCatalog,
) -> Result<HandlerOutcome> {
    let reply = prompts.pick(
        PromptKind::Pricing,
        state.language.code(),
        &state.conversation_id,
        0,
    );
    state.current_intent = None;
    Ok(HandlerOutcome::Reply(TurnResult::ending(reply)))
}
