use crate::commands::{create_error_embed, create_success_embed, CommandResult, Context};
use crate::components::event_sync::models::truncate_chars;
use crate::components::event_sync::{EventSync, SyncAction};
use crate::components::EventSyncHandle;
use crate::error::component_error;

/// Discord limit on embed descriptions
const EMBED_DESCRIPTION_LIMIT: usize = 4096;

/// Mirror the Steam group's events now instead of waiting for the next scheduled pass
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_EVENTS"
)]
pub async fn sync(ctx: Context<'_>) -> CommandResult {
    ctx.defer_ephemeral().await?;

    let Some(handle) = find_handle(ctx).await else {
        ctx.send(
            poise::CreateReply::default()
                .embed(create_error_embed(
                    "Event sync",
                    "The event sync component is not running.",
                ))
                .ephemeral(true),
        )
        .await?;
        return Err(component_error("event_sync component not available"));
    };

    let report = match handle.run_pass().await {
        Ok(report) => report,
        Err(e) => {
            ctx.send(
                poise::CreateReply::default()
                    .embed(create_error_embed("Event sync failed", &e.to_string()))
                    .ephemeral(true),
            )
            .await?;
            return Err(e);
        }
    };

    let mut message = format!(
        "Created: {}\nUpdated: {}\nDeleted: {}\nUnchanged: {}",
        report.created(),
        report.updated(),
        report.deleted(),
        report.unchanged()
    );
    if report.skipped_past() > 0 {
        message.push_str(&format!("\nAlready started: {}", report.skipped_past()));
    }
    if !report.skipped.is_empty() {
        message.push_str(&format!("\nUnreadable on Steam: {}", report.skipped.len()));
    }
    for outcome in &report.outcomes {
        if let SyncAction::Failed(reason) = &outcome.action {
            message.push_str(&format!("\nFailed: **{}** ({})", outcome.title, reason));
        }
    }

    ctx.send(
        poise::CreateReply::default()
            .embed(create_success_embed(
                "Event sync done",
                &truncate_chars(&message, EMBED_DESCRIPTION_LIMIT),
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

async fn find_handle(ctx: Context<'_>) -> Option<EventSyncHandle> {
    let component = ctx
        .data()
        .component_manager
        .as_ref()?
        .get_component_by_name("event_sync")?;
    let event_sync = component.as_any().downcast_ref::<EventSync>()?;
    event_sync.get_handle().await
}
