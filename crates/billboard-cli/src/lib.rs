use anyhow::{anyhow, Context};
use billboard_core::models::{BookingDetails, BookingType, UserDetails};
use clap::ValueEnum;
use uuid::Uuid;

/// Booking kinds accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BookingKind {
    Ad,
    Wish,
}

impl From<BookingKind> for BookingType {
    fn from(kind: BookingKind) -> Self {
        match kind {
            BookingKind::Ad => BookingType::Advertisement,
            BookingKind::Wish => BookingType::Wish,
        }
    }
}

/// Optional user and booking flags of the `analyze` command
#[derive(Debug, Clone, Default)]
pub struct ContextArgs {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub booking_id: Option<String>,
    pub booking_kind: Option<BookingKind>,
    pub billboard: Option<String>,
}

impl ContextArgs {
    pub fn user(&self) -> Option<UserDetails> {
        let id = self.user_id.clone()?;
        Some(UserDetails {
            name: self.user_name.clone().unwrap_or_else(|| id.clone()),
            id,
            email: self.email.clone(),
            push_token: None,
        })
    }

    pub fn booking(&self) -> Option<BookingDetails> {
        let id = self.booking_id.clone()?;
        Some(BookingDetails {
            id,
            booking_type: self.booking_kind.unwrap_or(BookingKind::Ad).into(),
            billboard_name: self.billboard.clone(),
            location: None,
        })
    }
}

pub fn parse_video_id(id: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(id.trim())
        .with_context(|| format!("Invalid video id: {}", id))
        .and_then(|uuid| {
            if uuid.is_nil() {
                Err(anyhow!("Invalid video id: nil uuid"))
            } else {
                Ok(uuid)
            }
        })
}

/// Initialize tracing for CLI binaries. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_needs_ids() {
        let args = ContextArgs::default();
        assert!(args.user().is_none());
        assert!(args.booking().is_none());
    }

    #[test]
    fn user_name_defaults_to_id() {
        let args = ContextArgs {
            user_id: Some("u1".to_string()),
            booking_id: Some("b1".to_string()),
            booking_kind: Some(BookingKind::Wish),
            ..Default::default()
        };
        assert_eq!(args.user().unwrap().name, "u1");
        assert_eq!(args.booking().unwrap().booking_type, BookingType::Wish);
    }

    #[test]
    fn video_ids_must_be_uuids() {
        let id = Uuid::new_v4();
        assert_eq!(parse_video_id(&format!(" {} ", id)).unwrap(), id);
        assert!(parse_video_id("b1").is_err());
        assert!(parse_video_id(&Uuid::nil().to_string()).is_err());
    }
}
