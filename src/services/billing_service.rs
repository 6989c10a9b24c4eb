use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::db::BillingStore;
use crate::error::AppError;
use crate::models::{EnrolledCourse, NewPayment, PaymentKind, Student, StudentStatus};
use crate::tuition::{BillingMonth, final_refund_amount, first_invoice_amount};

/// What happens to existing billing records when an inactive student returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactivationPolicy {
    /// Only clear the last class date.
    #[default]
    KeepRecords,
    /// Delete every refund but leave monthly charges as they are.
    DeleteRefunds,
    /// Delete refunds and rebuild monthly charges from the current month on.
    DeleteRefundsAndRegenerate,
}

impl FromStr for ReactivationPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep_records" => Ok(Self::KeepRecords),
            "delete_refunds" => Ok(Self::DeleteRefunds),
            "delete_refunds_and_regenerate" | "regenerate" => Ok(Self::DeleteRefundsAndRegenerate),
            other => Err(AppError::BadRequest(format!("unknown reactivation policy: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPolicy {
    /// Months of billing kept on file, counting the first billing month.
    pub horizon_months: u32,
    pub reactivation: ReactivationPolicy,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            horizon_months: 12,
            reactivation: ReactivationPolicy::default(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ReconcileReport {
    fn fail(&mut self, step: &str, student_id: &str, err: &AppError) {
        warn!("billing step '{}' failed for student {}: {}", step, student_id, err);
        self.failed += 1;
    }
}

/// Keeps a student's payment and refund records in line with their
/// enrollments and class dates.
///
/// Entry points never return an error. Each store call is attempted on its
/// own; a failure is logged, counted in the report, and the pass moves on to
/// the next record or course.
pub struct BillingService {
    store: Arc<dyn BillingStore>,
    clock: Arc<dyn Clock>,
    policy: BillingPolicy,
}

impl BillingService {
    pub fn new(store: Arc<dyn BillingStore>, clock: Arc<dyn Clock>, policy: BillingPolicy) -> Self {
        Self { store, clock, policy }
    }

    pub fn policy(&self) -> BillingPolicy {
        self.policy
    }

    /// Records a new enrollment and bills it. The insert itself is a normal
    /// write and its failure is returned.
    pub async fn enroll(&self, student_id: &str, course_id: &str) -> Result<ReconcileReport, AppError> {
        if self.store.fetch_student(student_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        if self.store.fetch_course(course_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        let today = self.clock.today();
        self.store.insert_enrollment(student_id, course_id, today).await?;
        Ok(self.enrollment_created(student_id, course_id).await)
    }

    /// Bills a freshly created enrollment: the collapsed first invoice, no
    /// separate charge for the month after, then one full charge per month
    /// through the horizon.
    pub async fn enrollment_created(&self, student_id: &str, course_id: &str) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let Some(student) = self.load_student(student_id, &mut report).await else {
            return report;
        };
        let courses = self.load_courses(&student, &mut report).await;
        let Some(course) = courses.iter().find(|c| c.course_id == course_id) else {
            info!("student {} is not enrolled in {}, nothing to bill", student_id, course_id);
            return report;
        };

        info!("billing new enrollment of student {} in {}", student_id, course_id);
        let start = billing_start(&student, course);
        self.bill_from_start(&student, course, start, &mut report).await;
        report
    }

    /// Moves billing to a new first class date. A cleared date only drops
    /// charges from before the student's enrollment date.
    pub async fn first_class_date_changed(
        &self,
        student_id: &str,
        first_class_date: Option<NaiveDate>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let Some(mut student) = self.load_student(student_id, &mut report).await else {
            return report;
        };
        let previous = student.first_class_date;

        if let Err(e) = self.store.set_first_class_date(student_id, first_class_date).await {
            report.fail("store first class date", student_id, &e);
        }
        student.first_class_date = first_class_date;

        let courses = self.load_courses(&student, &mut report).await;
        info!(
            "first class date of student {} is now {:?}; reconciling {} course(s)",
            student_id,
            first_class_date,
            courses.len()
        );

        for course in &courses {
            match first_class_date {
                Some(date) => {
                    let Some(cutoff) = BillingMonth::of(date).first_day() else {
                        report.skipped += 1;
                        continue;
                    };
                    self.delete_charges_before(&student, course, cutoff, &mut report).await;
                    self.bill_from_start(&student, course, date, &mut report).await;

                    let old_month = BillingMonth::of(previous.unwrap_or(course.enrolled_on));
                    if old_month >= BillingMonth::of(date).plus(2) {
                        self.reset_to_full_fee(&student, course, old_month, &mut report).await;
                    }
                }
                None => {
                    self.delete_charges_before(&student, course, student.enrollment_date, &mut report)
                        .await;
                }
            }
        }
        report
    }

    /// Takes a student out of billing. `last_class_date` defaults to their most
    /// recent attendance, then to today.
    pub async fn deactivate(&self, student_id: &str, last_class_date: Option<NaiveDate>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let Some(mut student) = self.load_student(student_id, &mut report).await else {
            return report;
        };

        let last_class_date = match last_class_date {
            Some(date) => date,
            None => self.resolve_last_class_date(student_id, &mut report).await,
        };

        if let Err(e) = self
            .store
            .set_status(student_id, StudentStatus::Inactive, Some(last_class_date))
            .await
        {
            report.fail("mark inactive", student_id, &e);
        }
        student.status = StudentStatus::Inactive;
        student.last_class_date = Some(last_class_date);

        info!("student {} deactivated with last class on {}", student_id, last_class_date);
        self.settle_final_month(&student, last_class_date, &mut report).await;
        report
    }

    /// Brings a student back. What happens to earlier records depends on the
    /// configured [`ReactivationPolicy`].
    pub async fn reactivate(&self, student_id: &str) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let Some(mut student) = self.load_student(student_id, &mut report).await else {
            return report;
        };

        if let Err(e) = self.store.set_status(student_id, StudentStatus::Active, None).await {
            report.fail("mark active", student_id, &e);
        }
        student.status = StudentStatus::Active;
        student.last_class_date = None;

        info!(
            "student {} reactivated (policy {:?})",
            student_id, self.policy.reactivation
        );
        match self.policy.reactivation {
            ReactivationPolicy::KeepRecords => {}
            ReactivationPolicy::DeleteRefunds => {
                self.delete_all_refunds(&student, &mut report).await;
            }
            ReactivationPolicy::DeleteRefundsAndRegenerate => {
                self.delete_all_refunds(&student, &mut report).await;
                let courses = self.load_courses(&student, &mut report).await;
                let current = BillingMonth::of(self.clock.today());
                for course in &courses {
                    self.extend_course(&student, course, current, &mut report).await;
                }
            }
        }
        report
    }

    /// Stores a corrected last class date; for an inactive student the final
    /// month is settled again from scratch.
    pub async fn last_class_date_changed(&self, student_id: &str, last_class_date: NaiveDate) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let Some(mut student) = self.load_student(student_id, &mut report).await else {
            return report;
        };

        if let Err(e) = self.store.set_last_class_date(student_id, Some(last_class_date)).await {
            report.fail("store last class date", student_id, &e);
        }
        student.last_class_date = Some(last_class_date);

        if student.is_active() {
            debug!("student {} is active, last class date stored only", student_id);
            return report;
        }
        self.settle_final_month(&student, last_class_date, &mut report).await;
        report
    }

    /// Removes an enrollment and its pending charges after today. Confirmed
    /// records stay.
    pub async fn withdraw(&self, student_id: &str, course_id: &str) -> Result<ReconcileReport, AppError> {
        if !self.store.delete_enrollment(student_id, course_id).await? {
            return Err(AppError::NotFound);
        }
        Ok(self.enrollment_removed(student_id, course_id).await)
    }

    pub async fn enrollment_removed(&self, student_id: &str, course_id: &str) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let today = self.clock.today();
        match self
            .store
            .delete_pending_course_payments_after(student_id, course_id, today)
            .await
        {
            Ok(n) => {
                info!("dropped {} pending charge(s) of student {} for {}", n, student_id, course_id);
                report.deleted += n as usize;
            }
            Err(e) => report.fail("drop pending charges", student_id, &e),
        }
        report
    }

    /// Rolls the forward horizon for every active student so there is always
    /// a full horizon of monthly charges ahead of the current month.
    pub async fn extend_horizon(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let ids = match self.store.fetch_active_student_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                report.fail("list active students", "*", &e);
                return report;
            }
        };

        let current = BillingMonth::of(self.clock.today());
        for student_id in ids {
            let Some(student) = self.load_student(&student_id, &mut report).await else {
                continue;
            };
            let courses = self.load_courses(&student, &mut report).await;
            for course in &courses {
                self.extend_course(&student, course, current, &mut report).await;
            }
        }
        info!("horizon extended through {}: {:?}", current.plus(self.horizon_span()), report);
        report
    }

    async fn load_student(&self, student_id: &str, report: &mut ReconcileReport) -> Option<Student> {
        match self.store.fetch_student(student_id).await {
            Ok(Some(student)) => Some(student),
            Ok(None) => {
                info!("student {} not found, nothing to reconcile", student_id);
                None
            }
            Err(e) => {
                report.fail("load student", student_id, &e);
                None
            }
        }
    }

    async fn load_courses(&self, student: &Student, report: &mut ReconcileReport) -> Vec<EnrolledCourse> {
        match self.store.fetch_enrolled_courses(&student.id).await {
            Ok(courses) => {
                if courses.is_empty() {
                    info!("student {} has no enrollments", student.id);
                }
                courses
            }
            Err(e) => {
                report.fail("load enrollments", &student.id, &e);
                Vec::new()
            }
        }
    }

    async fn resolve_last_class_date(&self, student_id: &str, report: &mut ReconcileReport) -> NaiveDate {
        match self.store.latest_attendance_date(student_id).await {
            Ok(Some(date)) => date,
            Ok(None) => self.clock.today(),
            Err(e) => {
                report.fail("latest attendance", student_id, &e);
                self.clock.today()
            }
        }
    }

    fn horizon_span(&self) -> u32 {
        self.policy.horizon_months.saturating_sub(1)
    }

    /// First invoice, suppressed second month, forward months.
    async fn bill_from_start(
        &self,
        student: &Student,
        course: &EnrolledCourse,
        start: NaiveDate,
        report: &mut ReconcileReport,
    ) {
        let first_month = BillingMonth::of(start);
        self.upsert_first_invoice(student, course, start, report).await;

        match self
            .store
            .delete_payments_in_month(&student.id, &course.course_id, PaymentKind::Payment, first_month.next())
            .await
        {
            Ok(n) => report.deleted += n as usize,
            Err(e) => report.fail("drop second-month charge", &student.id, &e),
        }

        self.ensure_monthly_charges(
            student,
            course,
            first_month.plus(2),
            first_month.plus(self.horizon_span()),
            report,
        )
        .await;
    }

    async fn upsert_first_invoice(
        &self,
        student: &Student,
        course: &EnrolledCourse,
        start: NaiveDate,
        report: &mut ReconcileReport,
    ) {
        let month = BillingMonth::of(start);
        let Some(due) = month.due_date(student.due_day()) else {
            report.skipped += 1;
            return;
        };
        let amount = first_invoice_amount(course.monthly_tuition_fee, &course.schedule, start);
        let past_last_class =
            !student.is_active() && student.last_class_date.is_some_and(|last| due > last);
        let suppressed = amount <= 0 || past_last_class;

        let existing = match self
            .store
            .find_payment_in_month(&student.id, &course.course_id, PaymentKind::Payment, month)
            .await
        {
            Ok(existing) => existing,
            Err(e) => {
                report.fail("find first invoice", &student.id, &e);
                return;
            }
        };

        match existing {
            Some(payment) if suppressed => match self.store.delete_payment(&payment.id).await {
                Ok(n) => report.deleted += n as usize,
                Err(e) => report.fail("delete first invoice", &student.id, &e),
            },
            None if suppressed => {
                debug!("no first invoice owed for {} in {}", course.course_id, month);
                report.skipped += 1;
            }
            Some(payment) if payment.amount == amount && payment.payment_date == due => {
                report.skipped += 1;
            }
            Some(payment) => match self.store.update_payment(&payment.id, amount, due).await {
                Ok(()) => {
                    debug!(
                        "first invoice {} for {} updated {} -> {}",
                        payment.id, course.course_id, payment.amount, amount
                    );
                    report.updated += 1;
                }
                Err(e) => report.fail("update first invoice", &student.id, &e),
            },
            None => {
                let new = NewPayment::pending_charge(&student.id, &course.course_id, amount, due);
                match self.store.insert_payment(&new).await {
                    Ok(payment) => {
                        debug!("first invoice {} for {} created: {}", payment.id, course.course_id, amount);
                        report.created += 1;
                    }
                    Err(e) => report.fail("create first invoice", &student.id, &e),
                }
            }
        }
    }

    /// A month that used to hold the collapsed first invoice becomes an
    /// ordinary forward month again.
    async fn reset_to_full_fee(
        &self,
        student: &Student,
        course: &EnrolledCourse,
        month: BillingMonth,
        report: &mut ReconcileReport,
    ) {
        let fee = course.monthly_tuition_fee;
        match self
            .store
            .find_payment_in_month(&student.id, &course.course_id, PaymentKind::Payment, month)
            .await
        {
            Ok(Some(payment)) if payment.amount != fee => {
                match self.store.update_payment(&payment.id, fee, payment.payment_date).await {
                    Ok(()) => {
                        debug!(
                            "former first invoice {} for {} reset {} -> {}",
                            payment.id, course.course_id, payment.amount, fee
                        );
                        report.updated += 1;
                    }
                    Err(e) => report.fail("reset former first invoice", &student.id, &e),
                }
            }
            Ok(_) => {}
            Err(e) => report.fail("find former first invoice", &student.id, &e),
        }
    }

    /// One full-fee charge per month in `from..=through`; existing months are
    /// left alone. Stops at an inactive student's last class date.
    async fn ensure_monthly_charges(
        &self,
        student: &Student,
        course: &EnrolledCourse,
        from: BillingMonth,
        through: BillingMonth,
        report: &mut ReconcileReport,
    ) {
        if course.monthly_tuition_fee <= 0 {
            return;
        }
        let cutoff = if student.is_active() { None } else { student.last_class_date };

        let mut month = from;
        while month <= through {
            let Some(due) = month.due_date(student.due_day()) else {
                report.skipped += 1;
                month = month.next();
                continue;
            };
            if cutoff.is_some_and(|last| due > last) {
                break;
            }

            match self
                .store
                .find_payment_in_month(&student.id, &course.course_id, PaymentKind::Payment, month)
                .await
            {
                Ok(Some(_)) => report.skipped += 1,
                Ok(None) => {
                    let new = NewPayment::pending_charge(&student.id, &course.course_id, course.monthly_tuition_fee, due);
                    match self.store.insert_payment(&new).await {
                        Ok(_) => report.created += 1,
                        Err(e) => report.fail("create monthly charge", &student.id, &e),
                    }
                }
                Err(e) => report.fail("find monthly charge", &student.id, &e),
            }
            month = month.next();
        }
    }

    /// Forward months from the current month, never reaching back into the
    /// collapsed first invoice.
    async fn extend_course(
        &self,
        student: &Student,
        course: &EnrolledCourse,
        current: BillingMonth,
        report: &mut ReconcileReport,
    ) {
        let first_month = BillingMonth::of(billing_start(student, course));
        let from = first_month.plus(2).max(current);
        let through = first_month.max(current).plus(self.horizon_span());
        self.ensure_monthly_charges(student, course, from, through, report).await;
    }

    async fn delete_charges_before(
        &self,
        student: &Student,
        course: &EnrolledCourse,
        cutoff: NaiveDate,
        report: &mut ReconcileReport,
    ) {
        match self
            .store
            .delete_payments_before(&student.id, &course.course_id, PaymentKind::Payment, cutoff)
            .await
        {
            Ok(n) => {
                if n > 0 {
                    debug!("dropped {} charge(s) for {} before {}", n, course.course_id, cutoff);
                }
                report.deleted += n as usize;
            }
            Err(e) => report.fail("drop early charges", &student.id, &e),
        }
    }

    async fn delete_all_refunds(&self, student: &Student, report: &mut ReconcileReport) {
        match self.store.delete_refunds(&student.id).await {
            Ok(n) => report.deleted += n as usize,
            Err(e) => report.fail("reset refunds", &student.id, &e),
        }
    }

    /// Refunds are rebuilt from nothing every time: clear them, drop charges
    /// after the last class, then refund the unattended part of its month.
    async fn settle_final_month(&self, student: &Student, last_class_date: NaiveDate, report: &mut ReconcileReport) {
        self.delete_all_refunds(student, report).await;

        match self
            .store
            .delete_payments_after(&student.id, PaymentKind::Payment, last_class_date)
            .await
        {
            Ok(n) => report.deleted += n as usize,
            Err(e) => report.fail("drop charges after last class", &student.id, &e),
        }

        let month = BillingMonth::of(last_class_date);
        let Some(due) = month.due_date(student.due_day()) else {
            report.skipped += 1;
            return;
        };

        let courses = self.load_courses(student, report).await;
        for course in &courses {
            let refund = final_refund_amount(
                course.monthly_tuition_fee,
                &course.schedule,
                billing_start(student, course),
                last_class_date,
            );
            if refund <= 0 {
                debug!("no refund owed for {} in {}", course.course_id, month);
                report.skipped += 1;
                continue;
            }

            match self
                .store
                .find_payment_in_month(&student.id, &course.course_id, PaymentKind::Refund, month)
                .await
            {
                Ok(Some(_)) => {
                    report.skipped += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    report.fail("find refund", &student.id, &e);
                    continue;
                }
            }

            let new = NewPayment::pending_refund(&student.id, &course.course_id, refund, due);
            match self.store.insert_payment(&new).await {
                Ok(payment) => {
                    info!("refund {} of {} created for {} in {}", payment.id, refund, course.course_id, month);
                    report.created += 1;
                }
                Err(e) => report.fail("create refund", &student.id, &e),
            }
        }
    }
}

/// The date billing starts for a course: the student's first class, else the
/// day the enrollment was made.
fn billing_start(student: &Student, course: &EnrolledCourse) -> NaiveDate {
    student.first_class_date.unwrap_or(course.enrolled_on)
}
