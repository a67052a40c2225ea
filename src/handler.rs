use std::sync::Arc;

use serenity::async_trait;
use serenity::client::Context;
use serenity::model::channel::{Message, Reaction};
use serenity::model::gateway::Ready;
use serenity::prelude::EventHandler;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::zkouska::creator::parse_command;
use crate::zkouska::serenity_platform::SerenityPlatform;
use crate::zkouska::{
    ChatPlatform, CreateRequest, ReactionProcessor, StateRebuilder, ToggleSignal, ZkouskaCreator,
};

pub struct Handler;

fn platform(ctx: &Context) -> Arc<dyn ChatPlatform> {
    Arc::new(SerenityPlatform::new(ctx.http.clone(), ctx.cache.clone()))
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(app_state) = AppState::from_ctx(&ctx).await else {
            warn!(target = "handler", "missing_app_state");
            return;
        };
        if msg.channel_id != app_state.zkouska.source_channel_id {
            return;
        }
        let Some(raw_description) = parse_command(&msg.content) else {
            return;
        };

        let creator = ZkouskaCreator::new(
            platform(&ctx),
            app_state.store.clone(),
            app_state.zkouska.destination_channel_id,
        );
        let request = CreateRequest {
            channel_id: msg.channel_id,
            command_message_id: msg.id,
            author_id: msg.author.id,
            raw_description: raw_description.to_string(),
        };
        if let Err(e) = creator.create(&request).await {
            warn!(target = "zkouska.create", user = %msg.author.name, error = %e, "zkouska not created");
            if let Err(why) = msg.channel_id.say(&ctx.http, e.user_message()).await {
                warn!(target = "handler", error = ?why, "error reply failed");
            }
        }
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        if reaction.member.as_ref().is_some_and(|m| m.user.bot) {
            return;
        }
        let Some(user_id) = reaction.user_id else {
            return;
        };
        let Some(app_state) = AppState::from_ctx(&ctx).await else {
            warn!(target = "handler", "missing_app_state");
            return;
        };
        if reaction.channel_id != app_state.zkouska.source_channel_id {
            return;
        }

        let signal = ToggleSignal {
            channel_id: reaction.channel_id,
            message_id: reaction.message_id,
            user_id,
            emoji: reaction.emoji.to_string(),
        };
        let processor = ReactionProcessor::new(platform(&ctx), app_state.store.clone());
        match processor.handle(&signal).await {
            Ok(outcome) => {
                debug!(target = "zkouska.reaction", message_id = %signal.message_id, user_id = %user_id, ?outcome, "reaction processed");
            }
            Err(e) => {
                warn!(target = "zkouska.reaction", message_id = %signal.message_id, user_id = %user_id, error = %e, "reaction left for retry");
            }
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(target = "handler", user = %ready.user.name, "connected and ready");
        let Some(app_state) = AppState::from_ctx(&ctx).await else {
            warn!(target = "handler", "missing_app_state");
            return;
        };
        // Gateway reconnects fire `ready` again; the store is only rebuilt once.
        if app_state.store.is_ready() {
            return;
        }
        let rebuilder = StateRebuilder::new(
            platform(&ctx),
            app_state.store.clone(),
            app_state.zkouska.source_channel_id,
            app_state.zkouska.destination_channel_id,
        );
        if let Some(report) = rebuilder.run_startup().await {
            info!(target = "handler", rebuilt = report.rebuilt, responders = report.responders, "zkouska tracking active");
        }
    }
}
