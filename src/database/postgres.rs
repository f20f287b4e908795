use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::store::{
    escape_like, ApplicationFilter, ApplicationListing, ApplicationStore, SortOrder, SortSpec,
};
use crate::error::{Error, Result};
use crate::models::applicant::ApplicantSummary;
use crate::models::application::{
    AcademicInfo, Application, Payment, PaymentMethod, PersonalInfo,
};
use crate::models::document::Document;
use crate::models::interview::Interview;
use crate::models::notification::{
    JobResolution, NotificationJob, NotificationRecord, QueuedNotification,
};
use crate::models::timeline::Timeline;

const APPLICATION_COLUMNS: &str = "a.id, a.applicant_id, a.school_id, a.application_status, \
     a.personal_info, a.academic_info, a.essay_answer, a.payment_status, a.payment_amount, \
     a.transaction_id, a.payment_method, a.timeline, a.documents, a.interview, a.notifications, \
     a.version, a.created_at, a.updated_at";

#[derive(Debug, FromRow)]
struct ApplicationRow {
    id: Uuid,
    applicant_id: Uuid,
    school_id: Uuid,
    application_status: String,
    personal_info: Json<PersonalInfo>,
    academic_info: Json<AcademicInfo>,
    essay_answer: Option<String>,
    payment_status: String,
    payment_amount: Decimal,
    transaction_id: Option<String>,
    payment_method: Option<String>,
    timeline: Json<Timeline>,
    documents: Json<Vec<Document>>,
    interview: Json<Interview>,
    notifications: Json<Vec<NotificationRecord>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const JOB_COLUMNS: &str = "id, application_id, applicant_id, template, params, status, \
     attempts, max_attempts, next_attempt_at, last_error, created_at";

#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    application_id: Uuid,
    applicant_id: Uuid,
    template: String,
    params: Json<Vec<String>>,
    status: String,
    attempts: i32,
    max_attempts: i32,
    next_attempt_at: DateTime<Utc>,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for QueuedNotification {
    type Error = Error;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(QueuedNotification {
            id: row.id,
            job: NotificationJob {
                application_id: row.application_id,
                applicant_id: row.applicant_id,
                template: row.template.parse()?,
                params: row.params.0,
            },
            status: row.status.parse()?,
            attempts: row.attempts,
            max_attempts: row.max_attempts,
            next_attempt_at: row.next_attempt_at,
            last_error: row.last_error,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    application: ApplicationRow,
    applicant_name: Option<String>,
    applicant_email: Option<String>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = Error;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        Ok(Application {
            id: row.id,
            applicant_id: row.applicant_id,
            school_id: row.school_id,
            application_status: row.application_status.parse()?,
            personal_info: row.personal_info.0,
            academic_info: row.academic_info.0,
            essay_answer: row.essay_answer,
            payment: Payment {
                status: row.payment_status.parse()?,
                amount: row.payment_amount,
                transaction_id: row.transaction_id,
                payment_method: row
                    .payment_method
                    .as_deref()
                    .map(str::parse::<PaymentMethod>)
                    .transpose()?,
            },
            timeline: row.timeline.0,
            documents: row.documents.0,
            interview: row.interview.0,
            notifications: row.notifications.0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<ListingRow> for ApplicationListing {
    type Error = Error;

    fn try_from(row: ListingRow) -> Result<Self> {
        let application = Application::try_from(row.application)?;
        let applicant = match (row.applicant_name, row.applicant_email) {
            (Some(name), Some(email)) => Some(ApplicantSummary {
                id: application.applicant_id,
                name,
                email,
            }),
            _ => None,
        };
        Ok(ApplicationListing {
            application,
            applicant,
        })
    }
}

#[derive(Clone)]
pub struct PgApplicationStore {
    pool: PgPool,
}

impl PgApplicationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filter<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &ApplicationFilter) {
        builder.push(" WHERE a.school_id = ").push_bind(filter.school_id);

        if let Some(status) = filter.status {
            builder
                .push(" AND a.application_status = ")
                .push_bind(status.label());
        }
        if let Some(search) = &filter.search {
            builder
                .push(" AND u.name ILIKE ")
                .push_bind(format!("%{}%", escape_like(search)));
        }
        if let Some((start, end)) = filter.created_between {
            builder
                .push(" AND a.created_at BETWEEN ")
                .push_bind(start)
                .push(" AND ")
                .push_bind(end);
        }
    }

    async fn count(&self, filter: &ApplicationFilter) -> Result<i64> {
        let mut total_query = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM applications a LEFT JOIN users u ON u.id = a.applicant_id",
        );
        Self::push_filter(&mut total_query, filter);
        let total = total_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

#[async_trait]
impl ApplicationStore for PgApplicationStore {
    async fn insert(&self, application: Application) -> Result<Application> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            INSERT INTO applications AS a (
                id, applicant_id, school_id, application_status,
                personal_info, academic_info, essay_answer,
                payment_status, payment_amount, transaction_id, payment_method,
                timeline, documents, interview, notifications,
                version, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4,
                $5, $6, $7,
                $8, $9, $10, $11,
                $12, $13, $14, $15,
                $16, $17, $18
            )
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        ))
        .bind(application.id)
        .bind(application.applicant_id)
        .bind(application.school_id)
        .bind(application.application_status.label())
        .bind(Json(&application.personal_info))
        .bind(Json(&application.academic_info))
        .bind(&application.essay_answer)
        .bind(application.payment.status.label())
        .bind(application.payment.amount)
        .bind(&application.payment.transaction_id)
        .bind(application.payment.payment_method.map(|m| m.label()))
        .bind(Json(&application.timeline))
        .bind(Json(&application.documents))
        .bind(Json(&application.interview))
        .bind(Json(&application.notifications))
        .bind(application.version)
        .bind(application.created_at)
        .bind(application.updated_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {} FROM applications a WHERE a.id = $1",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Application::try_from).transpose()
    }

    async fn save(&self, application: &Application) -> Result<Application> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            UPDATE applications AS a
            SET
                application_status = $3,
                payment_status = $4,
                payment_amount = $5,
                transaction_id = $6,
                payment_method = $7,
                timeline = $8,
                documents = $9,
                interview = $10,
                updated_at = $11,
                version = a.version + 1
            WHERE a.id = $1 AND a.version = $2
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        ))
        .bind(application.id)
        .bind(application.version)
        .bind(application.application_status.label())
        .bind(application.payment.status.label())
        .bind(application.payment.amount)
        .bind(&application.payment.transaction_id)
        .bind(application.payment.payment_method.map(|m| m.label()))
        .bind(Json(&application.timeline))
        .bind(Json(&application.documents))
        .bind(Json(&application.interview))
        .bind(application.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => {
                let exists: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM applications WHERE id = $1")
                        .bind(application.id)
                        .fetch_optional(&self.pool)
                        .await?;
                match exists {
                    Some(_) => Err(Error::Conflict(format!(
                        "Application {} was modified concurrently",
                        application.id
                    ))),
                    None => Err(Error::NotFound("Application not found".into())),
                }
            }
        }
    }

    async fn find(
        &self,
        filter: &ApplicationFilter,
        sort: SortSpec,
        skip: i64,
        limit: Option<i64>,
    ) -> Result<(Vec<ApplicationListing>, i64)> {
        let mut items_query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {}, u.name AS applicant_name, u.email AS applicant_email \
             FROM applications a LEFT JOIN users u ON u.id = a.applicant_id",
            APPLICATION_COLUMNS
        ));
        Self::push_filter(&mut items_query, filter);

        let nulls = match sort.order {
            SortOrder::Asc => "NULLS FIRST",
            SortOrder::Desc => "NULLS LAST",
        };
        items_query.push(format!(
            " ORDER BY {} {} {}, a.id {}",
            sort.field.column(),
            sort.order.keyword(),
            nulls,
            sort.order.keyword()
        ));
        if let Some(limit) = limit {
            items_query.push(" LIMIT ").push_bind(limit);
        }
        items_query.push(" OFFSET ").push_bind(skip.max(0));

        let rows = items_query
            .build_query_as::<ListingRow>()
            .fetch_all(&self.pool)
            .await?;
        let items = rows
            .into_iter()
            .map(ApplicationListing::try_from)
            .collect::<Result<Vec<_>>>()?;

        let total = self.count(filter).await?;
        Ok((items, total))
    }

    async fn find_applicant(&self, id: Uuid) -> Result<Option<ApplicantSummary>> {
        let applicant = sqlx::query_as::<_, ApplicantSummary>(
            "SELECT id, name, email FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(applicant)
    }

    async fn school_exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM schools WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn enqueue_notification(&self, job: NotificationJob) -> Result<QueuedNotification> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            INSERT INTO notification_jobs (id, application_id, applicant_id, template, params)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(job.application_id)
        .bind(job.applicant_id)
        .bind(job.template.key())
        .bind(Json(&job.params))
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn claim_notification(&self) -> Result<Option<QueuedNotification>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE notification_jobs SET status = 'running', updated_at = NOW()
            WHERE id = (
                SELECT id FROM notification_jobs
                WHERE status = 'pending' AND next_attempt_at <= NOW()
                ORDER BY created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(QueuedNotification::try_from).transpose()
    }

    async fn finish_notification(
        &self,
        job_id: Uuid,
        record: NotificationRecord,
        resolution: &JobResolution,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let appended = sqlx::query(
            r#"
            UPDATE applications
            SET notifications = notifications || $1::jsonb
            WHERE id = (SELECT application_id FROM notification_jobs WHERE id = $2)
            "#,
        )
        .bind(Json(vec![record]))
        .bind(job_id)
        .execute(&mut *tx)
        .await?;
        if appended.rows_affected() == 0 {
            return Err(Error::NotFound("Notification job not found".into()));
        }

        sqlx::query(
            r#"
            UPDATE notification_jobs
            SET status = $2,
                attempts = attempts + 1,
                next_attempt_at = COALESCE($3, next_attempt_at),
                last_error = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(resolution.status().label())
        .bind(resolution.next_attempt_at())
        .bind(resolution.error())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn release_stalled_notifications(&self) -> Result<u64> {
        let res = sqlx::query(
            "UPDATE notification_jobs SET status = 'pending', updated_at = NOW() WHERE status = 'running'",
        )
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    async fn find_notification_job(&self, id: Uuid) -> Result<Option<QueuedNotification>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM notification_jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QueuedNotification::try_from).transpose()
    }
}
