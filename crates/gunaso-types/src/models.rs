use serde::{Deserialize, Serialize};

/// Account role. Authority accounts are scoped to a single city and are the
/// only ones allowed to progress complaint status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Citizen,
    Authority,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Authority => "authority",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "citizen" => Some(Role::Citizen),
            "authority" => Some(Role::Authority),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Pothole,
    Streetlight,
    Garbage,
    Drainage,
    WaterSupply,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pothole => "pothole",
            Category::Streetlight => "streetlight",
            Category::Garbage => "garbage",
            Category::Drainage => "drainage",
            Category::WaterSupply => "water-supply",
            Category::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pothole" => Some(Category::Pothole),
            "streetlight" => Some(Category::Streetlight),
            "garbage" => Some(Category::Garbage),
            "drainage" => Some(Category::Drainage),
            "water-supply" => Some(Category::WaterSupply),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

/// Complaint lifecycle. The pending → in-progress → solved order is the
/// expected path but is not enforced: an authority may set any value.
/// Only the promotion rules ever set `Verified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Pending,
    InProgress,
    Solved,
    Verified,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in-progress",
            Status::Solved => "solved",
            Status::Verified => "verified",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Status::Pending),
            "in-progress" => Some(Status::InProgress),
            "solved" => Some(Status::Solved),
            "verified" => Some(Status::Verified),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Urgency::Low),
            "medium" => Some(Urgency::Medium),
            "high" => Some(Urgency::High),
            _ => None,
        }
    }
}

/// Point coordinate embedded in a complaint. City-scale flat-earth math is
/// applied to these; no great-circle handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_roundtrip_through_db_strings() {
        for s in [Status::Pending, Status::InProgress, Status::Solved, Status::Verified] {
            assert_eq!(Status::parse(s.as_str()), Some(s));
        }
        for c in [
            Category::Pothole,
            Category::Streetlight,
            Category::Garbage,
            Category::Drainage,
            Category::WaterSupply,
            Category::Other,
        ] {
            assert_eq!(Category::parse(c.as_str()), Some(c));
        }
        assert_eq!(Status::parse("fixed"), None);
    }

    #[test]
    fn kebab_case_wire_format() {
        assert_eq!(serde_json::to_string(&Status::InProgress).unwrap(), "\"in-progress\"");
        assert_eq!(serde_json::to_string(&Category::WaterSupply).unwrap(), "\"water-supply\"");
        let s: Status = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(s, Status::InProgress);
    }
}
