#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use admissions_backend::{
    database::{ApplicationStore, MemoryApplicationStore},
    error::{Error, Result},
    models::{
        actor::{Actor, Role},
        applicant::ApplicantSummary,
        application::{
            AcademicInfo, Application, Gender, PaymentStatus, PersonalInfo, SubjectGrade,
        },
    },
    services::{
        document_service::LocalMediaStore,
        notification_service::{EmailTemplate, Mailer, NotificationWorker},
    },
    AppState,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret_key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub template: EmailTemplate,
    pub params: Vec<String>,
}

/// Records every send; optionally fails all of them.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentEmail>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, template: EmailTemplate, params: &[String]) -> Result<()> {
        template.render(params)?;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentEmail {
                to: to.to_string(),
                template,
                params: params.to_vec(),
            });
        }
        if self.fail {
            return Err(Error::Mail("relay unavailable".into()));
        }
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryApplicationStore>,
    pub state: AppState,
    pub worker: NotificationWorker,
    pub mailer: Arc<RecordingMailer>,
    pub school_id: Uuid,
    pub staff: Actor,
}

pub fn harness_with(fail_mail: bool) -> Harness {
    let school_id = Uuid::new_v4();
    let store = Arc::new(MemoryApplicationStore::with_schools([school_id]));
    let mailer = Arc::new(RecordingMailer {
        fail: fail_mail,
        ..Default::default()
    });
    let uploads = std::env::temp_dir().join(format!("admissions-test-{}", Uuid::new_v4()));
    let media = Arc::new(LocalMediaStore::new(uploads, "/uploads"));
    let (state, worker) = AppState::new(store.clone(), mailer.clone(), media, JWT_SECRET);

    Harness {
        store,
        state,
        worker,
        mailer,
        school_id,
        staff: Actor::new(Uuid::new_v4(), Role::Staff, Some(school_id)),
    }
}

pub fn harness() -> Harness {
    harness_with(false)
}

pub fn personal_info(first: &str, last: &str) -> PersonalInfo {
    PersonalInfo {
        first_name: first.into(),
        last_name: last.into(),
        date_of_birth: NaiveDate::from_ymd_opt(2012, 5, 14).expect("valid date"),
        gender: Gender::Female,
        address: "12 Marina Road".into(),
        phone: Some("+2348000000000".into()),
    }
}

pub fn academic_info() -> AcademicInfo {
    AcademicInfo {
        previous_school: "Hillside Primary".into(),
        last_class: Some("Primary 6".into()),
        grades: vec![SubjectGrade {
            subject: "Mathematics".into(),
            grade: "A".into(),
        }],
    }
}

impl Harness {
    pub async fn add_applicant(&self, name: &str) -> ApplicantSummary {
        let id = Uuid::new_v4();
        let applicant = ApplicantSummary {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", id.simple()),
        };
        self.store.insert_applicant(applicant.clone()).await;
        applicant
    }

    /// Inserts an application for a fresh applicant, created `age_minutes` ago.
    pub async fn seed(&self, name: &str, paid: bool, age_minutes: i64) -> Application {
        self.seed_for_school(self.school_id, name, paid, age_minutes)
            .await
    }

    pub async fn seed_for_school(
        &self,
        school_id: Uuid,
        name: &str,
        paid: bool,
        age_minutes: i64,
    ) -> Application {
        let created_at: DateTime<Utc> = Utc::now() - Duration::minutes(age_minutes);
        self.seed_created_at(school_id, name, paid, created_at)
            .await
    }

    pub async fn seed_created_at(
        &self,
        school_id: Uuid,
        name: &str,
        paid: bool,
        created_at: DateTime<Utc>,
    ) -> Application {
        self.store.insert_school(school_id).await;
        let applicant = self.add_applicant(name).await;
        let (first, last) = name.split_once(' ').unwrap_or((name, ""));
        let mut app = Application::new(
            applicant.id,
            school_id,
            personal_info(first, last),
            academic_info(),
            None,
            Decimal::new(50_000, 0),
            created_at,
        );
        if paid {
            app.payment.status = PaymentStatus::Completed;
        }
        self.store.insert(app).await.expect("seed application")
    }

    pub async fn reload(&self, id: Uuid) -> Application {
        self.store
            .find_by_id(id)
            .await
            .expect("store lookup")
            .expect("application exists")
    }

    pub async fn deliver_notifications(&mut self) -> usize {
        self.worker.drain().await.expect("drain outbox")
    }
}
