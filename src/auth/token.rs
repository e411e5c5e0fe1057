//! The session token stored in the auth cookie.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, auth::UserID};

mod expiry_format {
    //! Serializes the expiry with a fixed width format.
    //!
    //! The `Display` output of [time::OffsetDateTime] writes midnight as
    //! "0:00:00.0", which the matching parser rejects because it expects two
    //! digit hours.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    /// e.g. "2021-01-01 00:00:00.000000 +00:00:00".
    const EXPIRY_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S>(expires_at: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let text = expires_at
            .format(EXPIRY_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&text, EXPIRY_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Proof that a user logged in, valid until `expires_at`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Token {
    pub user_id: UserID,

    #[serde(with = "expiry_format")]
    pub expires_at: OffsetDateTime,
}

impl Token {
    /// A token for `user_id` that expires `duration` from now.
    ///
    /// # Errors
    ///
    /// Returns [Error::CookieError] if the expiry would overflow.
    pub fn new(user_id: UserID, duration: Duration) -> Result<Self, Error> {
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(duration)
            .ok_or_else(|| Error::CookieError(format!("expiry overflowed for {duration:?}")))?;

        Ok(Self {
            user_id,
            expires_at,
        })
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= OffsetDateTime::now_utc()
    }
}
