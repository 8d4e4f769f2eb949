/* Per-operation frame scripts: brightness, LED animation mode, and profile selection.   */
/*                                                                                      */
/* Layout of a payload frame: [0x04, opcode, 0x00, command, ...fields]. For brightness  */
/* and LED mode the firmware expects the selected value both in the opcode offset and   */
/* in byte 8; the two must agree.                                                       */
/*                                                                                      */
/* The default profile tables below are placeholders, not a capture from a real device. */
/* They have the right shape but have not been verified against hardware; a USB        */
/* capture of the vendor tool is needed before relying on them. Callers holding such a */
/* capture pass it in as `ProfileTables` instead.                                      */
use std::borrow::Cow;

use crate::error::{GmmkError, Result};
use crate::frame::{Frame, REPORT_MARKER};
use crate::script::{Script, StepKind};

pub const MAX_BRIGHTNESS: u8 = 3;
pub const MAX_LED_MODE: u8 = 18;
pub const MAX_PROFILE: u8 = 2;

/* Base of the opcode byte for brightness and LED mode writes. */
const SETTING_OPCODE_BASE: u8 = 0x08;
const CMD_SET_SETTING: u8 = 0x06;
const SETTING_BRIGHTNESS: u8 = 0x01;
const SETTING_LED_MODE: u8 = 0x04;

/* Offset of the selected value in brightness and LED mode frames. */
pub const SETTING_VALUE_OFFSET: usize = 8;

/* ---------------------------------------------------------------------- */
/* Profile tables                                                         */
/* ---------------------------------------------------------------------- */

/* Status query sent before each profile transaction group. */
pub const STATUS_PROBE: Frame = Frame::build(&[REPORT_MARKER, 0x2F, 0x00, 0x2F]);

/* Placeholder profile-table metadata written before the per-profile rows. */
/* Not profile dependent.                                                 */
pub const PROFILE_TABLE_META: [Frame; 4] = [
    Frame::build(&[REPORT_MARKER, 0x3D, 0x00, 0x11, 0x2C, 0x00, 0x00, 0x00]),
    Frame::build(&[REPORT_MARKER, 0x67, 0x00, 0x11, 0x38, 0x2C, 0x00, 0x00, 0x02]),
    Frame::build(&[REPORT_MARKER, 0x91, 0x00, 0x11, 0x38, 0x64, 0x00, 0x00, 0x02]),
    PROFILE_CONFIG_BLOCK,
];

/* Fixed keyboard configuration block, sent as the last metadata frame. */
const PROFILE_CONFIG_BLOCK: Frame = Frame::build(&[
    REPORT_MARKER, 0x5A, 0x0B, 0x12, 0x38, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x55, 0xAA, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
    0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x03, 0x04, 0x04,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00,
]);

/* Offset of the row selector (2p or 2p+1) in per-profile row frames. */
pub const PROFILE_ROW_OFFSET: usize = 5;

/* One row of the per-profile table. The opcode and row selector are */
/* filled in from the profile index when the frame is built.         */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileRow {
    pub base_opcode: u8,
    /* Metadata rows live one slot past the data rows (2p + 1). */
    pub metadata: bool,
    pub template: Frame,
}

impl ProfileRow {
    pub const fn data(base_opcode: u8, fields: &[u8]) -> Self {
        Self {
            base_opcode,
            metadata: false,
            template: Frame::build(fields),
        }
    }

    pub const fn metadata(base_opcode: u8, fields: &[u8]) -> Self {
        Self {
            base_opcode,
            metadata: true,
            template: Frame::build(fields),
        }
    }

    pub fn selector(&self, profile: u8) -> u8 {
        profile.wrapping_mul(2).wrapping_add(u8::from(self.metadata))
    }

    pub fn opcode(&self, profile: u8) -> u8 {
        self.base_opcode.wrapping_add(self.selector(profile))
    }

    pub fn frame(&self, profile: u8) -> Frame {
        self.template
            .with_byte(1, self.opcode(profile))
            .with_byte(PROFILE_ROW_OFFSET, self.selector(profile))
    }
}

/* Placeholder per-profile rows, in the order the firmware expects them. */
pub const PROFILE_ROWS: [ProfileRow; 8] = [
    ProfileRow::data(0x47, &[REPORT_MARKER, 0x00, 0x00, 0x11, 0x36, 0x00, 0x00, 0x00, 0x00, 0x0A]),
    ProfileRow::data(0x73, &[REPORT_MARKER, 0x00, 0x00, 0x11, 0x36, 0x00, 0x36, 0x00, 0x00, 0x06]),
    ProfileRow::data(0xB0, &[REPORT_MARKER, 0x00, 0x00, 0x11, 0x36, 0x00, 0x6C, 0x00, 0x00, 0x07]),
    ProfileRow::data(0xE7, &[REPORT_MARKER, 0x00, 0x00, 0x11, 0x36, 0x00, 0xA2, 0x00, 0x00, 0x06]),
    ProfileRow::data(0x1F, &[REPORT_MARKER, 0x00, 0x00, 0x11, 0x36, 0x00, 0xD8, 0x00, 0x00, 0x09]),
    ProfileRow::metadata(0x56, &[REPORT_MARKER, 0x00, 0x00, 0x11, 0x36, 0x00, 0x00, 0x00, 0x1F]),
    ProfileRow::metadata(0x90, &[REPORT_MARKER, 0x00, 0x00, 0x11, 0x36, 0x00, 0x36, 0x00, 0x24]),
    ProfileRow::metadata(0xC6, &[REPORT_MARKER, 0x00, 0x00, 0x11, 0x36, 0x00, 0x6C, 0x00, 0x1A]),
];

const COMMIT_OPCODE_BASE: u8 = 0xE2;
const CMD_COMMIT: u8 = 0x12;

pub const COMMIT_PROFILE_OFFSET: usize = 8;
pub const COMMIT_MARKER_OFFSET: usize = 9;
pub const COMMIT_PERMUTATION_OFFSET: usize = 17;

pub const COMMIT_MARKER: [u8; 8] = [0x55, 0xAA, 0xFF, 0x02, 0x45, 0x0C, 0x2F, 0x65];

/* Key-group ordering applied by the commit frame. */
pub const COMMIT_PERMUTATION: [u8; 20] = [
    0x03, 0x0C, 0x00, 0x11, 0x07, 0x0E, 0x01, 0x13, 0x05, 0x0A, 0x02, 0x0F, 0x08, 0x12, 0x04,
    0x0B, 0x06, 0x10, 0x09, 0x0D,
];

pub const COMMIT_TEMPLATE: Frame = Frame::build(&[REPORT_MARKER, 0x00, 0x00, CMD_COMMIT, 0x1D])
    .with_bytes(COMMIT_MARKER_OFFSET, &COMMIT_MARKER)
    .with_bytes(COMMIT_PERMUTATION_OFFSET, &COMMIT_PERMUTATION);

/* Opaque tables written by a profile switch. Only the opcode, row selector */
/* and profile bytes are filled in; everything else is sent as given.       */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileTables {
    pub meta: Vec<Frame>,
    pub rows: Vec<ProfileRow>,
    pub commit_template: Frame,
}

impl ProfileTables {
    /* The built-in placeholder tables. */
    pub fn placeholder() -> Self {
        Self {
            meta: PROFILE_TABLE_META.to_vec(),
            rows: PROFILE_ROWS.to_vec(),
            commit_template: COMMIT_TEMPLATE,
        }
    }

    pub fn row_frames(&self, profile: u8) -> Result<Vec<Frame>> {
        check_range("profile", profile, MAX_PROFILE)?;
        Ok(self.rows.iter().map(|row| row.frame(profile)).collect())
    }

    pub fn commit_frame(&self, profile: u8) -> Result<Frame> {
        check_range("profile", profile, MAX_PROFILE)?;
        Ok(self
            .commit_template
            .with_byte(1, COMMIT_OPCODE_BASE + profile)
            .with_byte(COMMIT_PROFILE_OFFSET, profile))
    }
}

impl Default for ProfileTables {
    fn default() -> Self {
        Self::placeholder()
    }
}

/* ---------------------------------------------------------------------- */
/* Frame builders                                                         */
/* ---------------------------------------------------------------------- */

fn check_range(what: &str, value: u8, max: u8) -> Result<()> {
    if value > max {
        return Err(GmmkError::InvalidValue(format!(
            "{what} {value} out of range 0..={max}"
        )));
    }
    Ok(())
}

fn setting_frame(setting: u8, value: u8) -> Frame {
    Frame::build(&[
        REPORT_MARKER,
        SETTING_OPCODE_BASE + value,
        0x00,
        CMD_SET_SETTING,
        0x01,
        setting,
        0x00,
        0x00,
        value,
    ])
}

pub fn brightness_frame(level: u8) -> Result<Frame> {
    check_range("brightness", level, MAX_BRIGHTNESS)?;
    Ok(setting_frame(SETTING_BRIGHTNESS, level))
}

/* Earlier tooling sent opcode 0x0c with value mode+1; the firmware in */
/* the field expects 0x08+mode with value mode.                        */
pub fn led_mode_frame(mode: u8) -> Result<Frame> {
    check_range("LED mode", mode, MAX_LED_MODE)?;
    Ok(setting_frame(SETTING_LED_MODE, mode))
}

/* ---------------------------------------------------------------------- */
/* Scripts                                                                */
/* ---------------------------------------------------------------------- */

pub fn set_brightness(level: u8) -> Result<Script> {
    let frame = brightness_frame(level)?;
    Ok(Script::new("set_brightness").transaction([Cow::Owned(frame)]))
}

pub fn set_led_mode(mode: u8) -> Result<Script> {
    let frame = led_mode_frame(mode)?;
    Ok(Script::new("set_led_mode").transaction([Cow::Owned(frame)]))
}

/* Select `profile`. The firmware stages state per transaction, so the */
/* whole sequence has to land in this exact order:                     */
/*   probe, table metadata transaction, profile row transaction,       */
/*   probe, commit.                                                    */
/* Uses the placeholder tables; see `set_profile_with`.                */
pub fn set_profile(profile: u8) -> Result<Script> {
    set_profile_with(profile, &ProfileTables::placeholder())
}

/* Select `profile` writing caller-supplied `tables`. */
pub fn set_profile_with(profile: u8, tables: &ProfileTables) -> Result<Script> {
    let rows = tables.row_frames(profile)?;
    let commit = tables.commit_frame(profile)?;

    Ok(Script::new("set_profile")
        .standalone(StepKind::Probe, Cow::Borrowed(&STATUS_PROBE))
        .transaction(tables.meta.iter().copied().map(Cow::Owned))
        .transaction(rows.into_iter().map(Cow::Owned))
        .standalone(StepKind::Probe, Cow::Borrowed(&STATUS_PROBE))
        .standalone(StepKind::Commit, Cow::Owned(commit)))
}
