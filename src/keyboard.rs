/* High-level lighting operations driven over any `Transport`. */
use tracing::{debug, info, warn};

use crate::command::{self, ProfileTables};
use crate::error::Result;
use crate::script::{Script, execute};
use crate::transport::Transport;

/* Borrowed handle for issuing lighting operations. One operation runs at a time. */
pub struct Keyboard<'t, T: Transport + ?Sized> {
    transport: &'t mut T,
}

impl<'t, T: Transport + ?Sized> Keyboard<'t, T> {
    pub fn new(transport: &'t mut T) -> Self {
        Self { transport }
    }

    /* Set backlight brightness, 0 (off) to 3. */
    pub async fn set_brightness(&mut self, level: u8) -> Result<()> {
        let script = command::set_brightness(level)?;
        self.run(&script).await?;
        info!("Brightness set to {level}");
        Ok(())
    }

    /* Select LED animation mode 0..=18. */
    pub async fn set_led_mode(&mut self, mode: u8) -> Result<()> {
        let script = command::set_led_mode(mode)?;
        self.run(&script).await?;
        info!("LED mode set to {mode}");
        Ok(())
    }

    /* Switch to profile 0..=2 using the placeholder tables. */
    pub async fn set_profile(&mut self, profile: u8) -> Result<()> {
        self.set_profile_with(profile, &ProfileTables::placeholder()).await
    }

    /* Switch to profile 0..=2 writing `tables`. On failure the device may      */
    /* hold a partially staged profile; re-running the operation overwrites it. */
    pub async fn set_profile_with(&mut self, profile: u8, tables: &ProfileTables) -> Result<()> {
        let script = command::set_profile_with(profile, tables)?;
        let replies = self.run(&script).await.inspect_err(|e| {
            if e.is_transfer() {
                warn!("Profile {profile} switch interrupted, device may hold a partial profile");
            }
        })?;
        if let Some(status) = replies.first() {
            debug!("Profile status before switch: {:02x?}", &status[..status.len().min(8)]);
        }
        info!("Profile {profile} selected");
        Ok(())
    }

    /* Execute an arbitrary script, e.g. one built from opaque payload frames. */
    pub async fn run(&mut self, script: &Script) -> Result<Vec<Vec<u8>>> {
        execute(&mut *self.transport, script).await
    }
}
