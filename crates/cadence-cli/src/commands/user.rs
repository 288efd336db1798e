//! `cadence user …`

use anyhow::{bail, Result};
use cadence_users::UserUpdate;

use super::Context;
use crate::UserCommands;

pub fn execute(ctx: &Context, cmd: UserCommands) -> Result<()> {
    let users = ctx.users()?;
    match cmd {
        UserCommands::Token { name, password } => {
            let user = users.authenticate(&name, &password)?;
            println!("{}", user.token);
        }
        UserCommands::Update {
            name,
            password,
            new_name,
            new_password,
        } => {
            let update = UserUpdate {
                user_name: new_name,
                password: new_password,
            };
            if update.is_empty() {
                bail!("nothing to update: pass --new-name and/or --new-password");
            }
            let rotated = update.password.is_some();
            let user = users.update_user(&name, &password, &update)?;
            println!("user {} updated", user.user_name);
            if rotated {
                println!("new token: {}", user.token);
            }
        }
    }
    Ok(())
}
