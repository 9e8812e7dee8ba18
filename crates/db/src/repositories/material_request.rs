use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use matreq_core::domain::profile::{Caller, CompanyId, UserId};
use matreq_core::domain::request::{
    EnrichedMaterialRequest, MaterialRequest, MaterialRequestId, MaterialRequestPatch,
    NewMaterialRequest,
};
use matreq_core::domain::status::RequestStatus;

use super::{
    format_timestamp, parse_timestamp, patched_request, MaterialRequestRepository,
    RepositoryError,
};
use crate::DbPool;

const REQUEST_COLUMNS: &str = "r.id, r.project_id, r.material_name, r.quantity, r.unit, r.status,
    r.priority, r.requested_by, r.requested_at, r.notes, r.company_id, r.updated_at";

pub struct SqlMaterialRequestRepository {
    pool: DbPool,
    enforce_transitions: bool,
}

impl SqlMaterialRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, enforce_transitions: true }
    }

    /// When disabled, status patches are written without consulting the transition table.
    pub fn with_transition_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_transitions = enforce;
        self
    }

    async fn company_of(&self, user_id: &UserId) -> Result<Option<CompanyId>, RepositoryError> {
        let company_id: Option<String> =
            sqlx::query_scalar("SELECT company_id FROM profiles WHERE id = ?")
                .bind(&user_id.0)
                .fetch_optional(&self.pool)
                .await?;
        Ok(company_id.map(CompanyId))
    }

    async fn find_in_company(
        &self,
        company_id: &CompanyId,
        id: &MaterialRequestId,
    ) -> Result<Option<MaterialRequest>, RepositoryError> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM material_requests r WHERE r.id = ? AND r.company_id = ?"
        );
        let row = sqlx::query(&sql)
            .bind(&id.0)
            .bind(&company_id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_request).transpose()
    }
}

fn decode<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_request(row: &SqliteRow) -> Result<MaterialRequest, RepositoryError> {
    let unit: String = decode(row, "unit")?;
    let status: String = decode(row, "status")?;
    let priority: String = decode(row, "priority")?;
    let requested_at: String = decode(row, "requested_at")?;
    let updated_at: String = decode(row, "updated_at")?;

    Ok(MaterialRequest {
        id: MaterialRequestId(decode(row, "id")?),
        project_id: decode(row, "project_id")?,
        material_name: decode(row, "material_name")?,
        quantity: decode(row, "quantity")?,
        unit: unit.parse().map_err(|e| RepositoryError::Decode(format!("unit: {e}")))?,
        status: status.parse().map_err(|e| RepositoryError::Decode(format!("status: {e}")))?,
        priority: priority
            .parse()
            .map_err(|e| RepositoryError::Decode(format!("priority: {e}")))?,
        requested_by: UserId(decode(row, "requested_by")?),
        requested_at: parse_timestamp("requested_at", &requested_at)?,
        notes: decode(row, "notes")?,
        company_id: CompanyId(decode(row, "company_id")?),
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait::async_trait]
impl MaterialRequestRepository for SqlMaterialRequestRepository {
    async fn list(
        &self,
        caller: &Caller,
        filter: Option<RequestStatus>,
    ) -> Result<Vec<EnrichedMaterialRequest>, RepositoryError> {
        let Some(company_id) = self.company_of(&caller.user_id).await? else {
            return Ok(Vec::new());
        };

        let sql = format!(
            "SELECT {REQUEST_COLUMNS}, p.email AS requester_email
             FROM material_requests r
             LEFT JOIN profiles p ON p.id = r.requested_by AND p.company_id = r.company_id
             WHERE r.company_id = ? AND (? IS NULL OR r.status = ?)
             ORDER BY r.requested_at DESC, r.id DESC"
        );
        let status = filter.map(RequestStatus::as_str);
        let rows = sqlx::query(&sql)
            .bind(&company_id.0)
            .bind(status)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let email: Option<String> = decode(row, "requester_email")?;
                Ok(EnrichedMaterialRequest::new(row_to_request(row)?, email))
            })
            .collect()
    }

    async fn find_by_id(
        &self,
        caller: &Caller,
        id: &MaterialRequestId,
    ) -> Result<Option<MaterialRequest>, RepositoryError> {
        match self.company_of(&caller.user_id).await? {
            Some(company_id) => self.find_in_company(&company_id, id).await,
            None => Ok(None),
        }
    }

    async fn create(
        &self,
        caller: &Caller,
        fields: NewMaterialRequest,
    ) -> Result<MaterialRequest, RepositoryError> {
        let company_id = self
            .company_of(&caller.user_id)
            .await?
            .ok_or_else(|| RepositoryError::ProfileNotFound(caller.user_id.0.clone()))?;
        fields.validate()?;

        let request = fields.into_request(
            MaterialRequestId::generate(),
            caller.user_id.clone(),
            company_id,
            Utc::now(),
        );

        sqlx::query(
            "INSERT INTO material_requests (id, project_id, material_name, quantity, unit, status,
                                            priority, requested_by, requested_at, notes,
                                            company_id, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.project_id)
        .bind(&request.material_name)
        .bind(request.quantity)
        .bind(request.unit.as_str())
        .bind(request.status.as_str())
        .bind(request.priority.as_str())
        .bind(&request.requested_by.0)
        .bind(format_timestamp(request.requested_at))
        .bind(&request.notes)
        .bind(&request.company_id.0)
        .bind(format_timestamp(request.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(request)
    }

    async fn update(
        &self,
        caller: &Caller,
        id: &MaterialRequestId,
        patch: MaterialRequestPatch,
    ) -> Result<MaterialRequest, RepositoryError> {
        let not_found = || RepositoryError::NotFound(id.0.clone());
        let company_id = self.company_of(&caller.user_id).await?.ok_or_else(not_found)?;
        let existing = self.find_in_company(&company_id, id).await?.ok_or_else(not_found)?;

        let updated = patched_request(existing, &patch, self.enforce_transitions, Utc::now())?;

        let result = sqlx::query(
            "UPDATE material_requests
             SET material_name = ?, quantity = ?, unit = ?, status = ?, priority = ?,
                 notes = ?, updated_at = ?
             WHERE id = ? AND company_id = ?",
        )
        .bind(&updated.material_name)
        .bind(updated.quantity)
        .bind(updated.unit.as_str())
        .bind(updated.status.as_str())
        .bind(updated.priority.as_str())
        .bind(&updated.notes)
        .bind(format_timestamp(updated.updated_at))
        .bind(&id.0)
        .bind(&company_id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }

        Ok(updated)
    }

    async fn remove(
        &self,
        caller: &Caller,
        id: &MaterialRequestId,
    ) -> Result<(), RepositoryError> {
        let company_id = self
            .company_of(&caller.user_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(id.0.clone()))?;

        let result = sqlx::query("DELETE FROM material_requests WHERE id = ? AND company_id = ?")
            .bind(&id.0)
            .bind(&company_id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.0.clone()));
        }

        Ok(())
    }
}
