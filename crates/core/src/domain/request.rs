use crate::domain::upload::{FileId, UploadedFile};
use crate::error::ClientError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CardType {
    #[serde(rename = "Any")]
    Any,
    #[serde(rename = "VISA")]
    Visa,
    #[serde(rename = "Mastercard")]
    Mastercard,
    #[serde(rename = "American Express")]
    AmericanExpress,
    #[serde(rename = "Discover")]
    Discover,
}

impl CardType {
    pub const ALL: [CardType; 5] = [
        CardType::Any,
        CardType::Visa,
        CardType::Mastercard,
        CardType::AmericanExpress,
        CardType::Discover,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CardType::Any => "Any",
            CardType::Visa => "VISA",
            CardType::Mastercard => "Mastercard",
            CardType::AmericanExpress => "American Express",
            CardType::Discover => "Discover",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RewardType {
    #[serde(rename = "Any")]
    Any,
    #[serde(rename = "Hotel")]
    Hotel,
    #[serde(rename = "Flights")]
    Flights,
    #[serde(rename = "Cash Back")]
    CashBack,
    #[serde(rename = "Dining")]
    Dining,
    #[serde(rename = "Gas")]
    Gas,
    #[serde(rename = "Groceries")]
    Groceries,
}

impl RewardType {
    pub const ALL: [RewardType; 7] = [
        RewardType::Any,
        RewardType::Hotel,
        RewardType::Flights,
        RewardType::CashBack,
        RewardType::Dining,
        RewardType::Gas,
        RewardType::Groceries,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RewardType::Any => "Any",
            RewardType::Hotel => "Hotel",
            RewardType::Flights => "Flights",
            RewardType::CashBack => "Cash Back",
            RewardType::Dining => "Dining",
            RewardType::Gas => "Gas",
            RewardType::Groceries => "Groceries",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AnnualFeeRange {
    #[default]
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "0-100")]
    UpTo100,
    #[serde(rename = "100-200")]
    From100To200,
    #[serde(rename = "200-300")]
    From200To300,
    #[serde(rename = "300+")]
    Over300,
}

impl AnnualFeeRange {
    pub const ALL: [AnnualFeeRange; 5] = [
        AnnualFeeRange::Any,
        AnnualFeeRange::UpTo100,
        AnnualFeeRange::From100To200,
        AnnualFeeRange::From200To300,
        AnnualFeeRange::Over300,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnnualFeeRange::Any => "any",
            AnnualFeeRange::UpTo100 => "0-100",
            AnnualFeeRange::From100To200 => "100-200",
            AnnualFeeRange::From200To300 => "200-300",
            AnnualFeeRange::Over300 => "300+",
        }
    }
}

macro_rules! display_and_parse {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ClientError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize_label(s);
                $ty::ALL
                    .into_iter()
                    .find(|v| normalize_label(v.as_str()) == wanted)
                    .ok_or_else(|| {
                        let known: Vec<_> = $ty::ALL.iter().map(|v| v.as_str()).collect();
                        ClientError::Validation(format!(
                            "unknown {} '{}' (expected one of: {})",
                            $what,
                            s.trim(),
                            known.join(", ")
                        ))
                    })
            }
        }
    };
}

display_and_parse!(CardType, "card type");
display_and_parse!(RewardType, "reward type");
display_and_parse!(AnnualFeeRange, "annual fee range");

// "cash-back", "Cash Back" and "cashback" all name the same option.
fn normalize_label(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || *c == '+')
        .flat_map(char::to_lowercase)
        .collect()
}

/// What the request points at besides its filters.
#[derive(Debug, Clone)]
pub enum Attachment {
    /// A statement uploaded earlier; sent as the `fileId` field.
    Uploaded(FileId),
    /// A statement sent along with the request as the `statementFile` field.
    Inline(UploadedFile),
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationRequest {
    pub card_types: BTreeSet<CardType>,
    pub reward_types: BTreeSet<RewardType>,
    pub annual_fee_range: AnnualFeeRange,
    pub additional_requirements: String,
    pub attachment: Option<Attachment>,
}

/// The JSON document carried in the `filters` form field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltersPayload<'a> {
    pub card_types: &'a BTreeSet<CardType>,
    pub reward_types: &'a BTreeSet<RewardType>,
    pub annual_fee_range: AnnualFeeRange,
    pub additional_requirements: &'a str,
}

impl RecommendationRequest {
    pub fn with_file_id(mut self, file_id: FileId) -> Self {
        self.attachment = Some(Attachment::Uploaded(file_id));
        self
    }

    pub fn with_statement(mut self, file: UploadedFile) -> Self {
        self.attachment = Some(Attachment::Inline(file));
        self
    }

    /// True when nothing distinguishes this request from a blank form.
    pub fn is_empty(&self) -> bool {
        self.card_types.is_empty()
            && self.reward_types.is_empty()
            && self.annual_fee_range == AnnualFeeRange::Any
            && self.additional_requirements.trim().is_empty()
            && self.attachment.is_none()
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.is_empty() {
            return Err(ClientError::Validation(
                "select at least one preference, describe your requirements, or attach a statement"
                    .to_string(),
            ));
        }
        if let Some(Attachment::Inline(file)) = &self.attachment {
            file.validate()?;
        }
        Ok(())
    }

    pub fn filters(&self) -> FiltersPayload<'_> {
        FiltersPayload {
            card_types: &self.card_types,
            reward_types: &self.reward_types,
            annual_fee_range: self.annual_fee_range,
            additional_requirements: self.additional_requirements.trim(),
        }
    }

    pub fn filters_json(&self) -> Result<String, ClientError> {
        serde_json::to_string(&self.filters())
            .map_err(|e| ClientError::Validation(format!("failed to encode filters: {e}")))
    }
}
