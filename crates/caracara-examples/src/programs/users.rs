//! User management examples

use tracing::info;

use super::{ExampleContext, pretty_print};
use crate::cli::UsersExample;
use crate::error::{ExampleError, Result};

pub async fn run(example: UsersExample, ctx: &ExampleContext) -> Result<()> {
    match example {
        UsersExample::AddUser => add_user(ctx).await,
        UsersExample::DeleteUser => delete_user(ctx).await,
        UsersExample::DescribeRoles => {
            info!("Describing all possible roles in the Falcon tenant");
            let roles = ctx.client.users().describe_available_roles().await?;
            pretty_print(&roles, false)
        }
        UsersExample::DescribeUsers => {
            info!("Describing all users in the Falcon tenant");
            let users = ctx.client.users().describe_users((), None).await?;
            pretty_print(&users, false)
        }
    }
}

async fn add_user(ctx: &ExampleContext) -> Result<()> {
    let first_name = ctx.settings.require_str("first_name")?;
    let last_name = ctx.settings.require_str("last_name")?;
    let email_address = ctx.settings.require_str("email_address")?;

    info!("Adding a user in the Falcon tenant");
    let user = ctx
        .client
        .users()
        .add_user(&first_name, &last_name, &email_address)
        .await?;
    pretty_print(&user, false)
}

/// Delete a user by `uuid`, or by `email_address` when no UUID is configured
async fn delete_user(ctx: &ExampleContext) -> Result<()> {
    let uuid = match ctx.settings.get_str("uuid") {
        Some(uuid) if !uuid.is_empty() => uuid,
        _ => {
            let email = ctx
                .settings
                .get_str("email_address")
                .filter(|e| !e.is_empty())
                .ok_or_else(|| ExampleError::MissingArgument("uuid".to_string()))?;
            info!("Retrieving UUID for {}", email);
            ctx.client.users().get_uuid_by_email(&email).await?
        }
    };

    info!("Deleting user {} from the Falcon tenant", uuid);
    let deleted = ctx.client.users().delete_user(&uuid).await?;
    if deleted {
        info!("Deleted user {}", uuid);
    } else {
        info!("User {} was not deleted", uuid);
    }
    Ok(())
}
