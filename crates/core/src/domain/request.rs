use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::profile::{CompanyId, UserId};
use crate::domain::status::RequestStatus;
use crate::errors::DomainError;

pub const MAX_MATERIAL_NAME_CHARS: usize = 200;
pub const MAX_NOTES_CHARS: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialRequestId(pub String);

impl MaterialRequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for MaterialRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Kg,
    M,
    Pieces,
    M2,
    M3,
    Liters,
    Tons,
}

impl Unit {
    pub const ALL: [Unit; 7] =
        [Self::Kg, Self::M, Self::Pieces, Self::M2, Self::M3, Self::Liters, Self::Tons];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kg => "kg",
            Self::M => "m",
            Self::Pieces => "pieces",
            Self::M2 => "m2",
            Self::M3 => "m3",
            Self::Liters => "liters",
            Self::Tons => "tons",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|unit| unit.as_str() == normalized).ok_or_else(|| {
            DomainError::validation(
                "unit",
                format!("unknown unit `{normalized}` (expected kg|m|pieces|m2|m3|liters|tons)"),
            )
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(DomainError::validation(
                "priority",
                format!("unknown priority `{other}` (expected low|medium|high|urgent)"),
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialRequest {
    pub id: MaterialRequestId,
    pub project_id: Option<String>,
    pub material_name: String,
    pub quantity: f64,
    pub unit: Unit,
    pub status: RequestStatus,
    pub priority: Priority,
    pub requested_by: UserId,
    pub requested_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub company_id: CompanyId,
    pub updated_at: DateTime<Utc>,
}

impl MaterialRequest {
    /// Moves the request along the status table. Self-loops are accepted as no-ops.
    pub fn transition_to(&mut self, next: RequestStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(next)?;
        Ok(())
    }

    /// Overwrites the fields present in `patch`. Status is copied verbatim; callers
    /// that need the transition table consult it before applying.
    pub fn apply_patch(&mut self, patch: &MaterialRequestPatch) {
        if let Some(material_name) = &patch.material_name {
            self.material_name = material_name.trim().to_string();
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(notes) = &patch.notes {
            self.notes = normalize_notes(Some(notes.clone()));
        }
    }
}

/// Creation payload. There is deliberately no status field: new requests are always pending.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewMaterialRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub material_name: String,
    pub quantity: f64,
    pub unit: Unit,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewMaterialRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_material_name(&self.material_name)?;
        validate_quantity(self.quantity)?;
        if let Some(notes) = &self.notes {
            validate_notes(notes)?;
        }
        if let Some(project_id) = &self.project_id {
            validate_project_id(project_id)?;
        }
        Ok(())
    }

    pub fn into_request(
        self,
        id: MaterialRequestId,
        requested_by: UserId,
        company_id: CompanyId,
        now: DateTime<Utc>,
    ) -> MaterialRequest {
        MaterialRequest {
            id,
            project_id: self.project_id.map(|value| value.trim().to_string()),
            material_name: self.material_name.trim().to_string(),
            quantity: self.quantity,
            unit: self.unit,
            status: RequestStatus::INITIAL,
            priority: self.priority,
            requested_by,
            requested_at: now,
            notes: normalize_notes(self.notes),
            company_id,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialRequestPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MaterialRequestPatch {
    pub fn status(status: RequestStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.material_name.is_none()
            && self.quantity.is_none()
            && self.unit.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.notes.is_none()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.is_empty() {
            return Err(DomainError::validation("patch", "at least one field must be provided"));
        }
        if let Some(material_name) = &self.material_name {
            validate_material_name(material_name)?;
        }
        if let Some(quantity) = self.quantity {
            validate_quantity(quantity)?;
        }
        if let Some(notes) = &self.notes {
            validate_notes(notes)?;
        }
        Ok(())
    }
}

/// A request joined with the requester's display identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnrichedMaterialRequest {
    #[serde(flatten)]
    pub request: MaterialRequest,
    pub requested_by_display: String,
}

impl EnrichedMaterialRequest {
    pub fn new(request: MaterialRequest, display: Option<String>) -> Self {
        let requested_by_display = display
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| request.requested_by.0.clone());
        Self { request, requested_by_display }
    }
}

pub fn validate_material_name(value: &str) -> Result<(), DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("material_name", "Material name is required"));
    }
    if trimmed.chars().count() > MAX_MATERIAL_NAME_CHARS {
        return Err(DomainError::validation("material_name", "Material name too long"));
    }
    Ok(())
}

pub fn validate_quantity(value: f64) -> Result<(), DomainError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DomainError::validation("quantity", "Quantity must be positive"));
    }
    Ok(())
}

pub fn validate_notes(value: &str) -> Result<(), DomainError> {
    if value.chars().count() > MAX_NOTES_CHARS {
        return Err(DomainError::validation("notes", "Notes too long"));
    }
    Ok(())
}

pub fn validate_project_id(value: &str) -> Result<(), DomainError> {
    Uuid::parse_str(value.trim())
        .map(|_| ())
        .map_err(|_| DomainError::validation("project_id", "Project reference must be a UUID"))
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}
