use crate::domain::attempt::Attempt;
use crate::domain::enrollment::Enrollment;
use crate::domain::payment::Payment;
use crate::error::Result;
use std::io::Write;

/// Writes the final ledger, enrollment and attempt state as CSV sections.
///
/// Timestamps are omitted so the output is stable across runs.
pub struct ReportWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_report(
        &mut self,
        payments: &[Payment],
        enrollments: &[Enrollment],
        attempts: &[Attempt],
    ) -> Result<()> {
        self.write_payments(payments)?;
        writeln!(self.writer)?;
        self.write_enrollments(enrollments)?;
        writeln!(self.writer)?;
        self.write_attempts(attempts)?;
        Ok(())
    }

    fn write_payments(&mut self, payments: &[Payment]) -> Result<()> {
        let mut csv = csv::Writer::from_writer(&mut self.writer);
        csv.write_record(["payment", "student", "course", "method", "status", "amount"])?;
        for p in payments {
            csv.write_record([
                p.id.to_string(),
                p.student.to_string(),
                p.course.to_string(),
                format!("{:?}", p.method).to_lowercase(),
                format!("{:?}", p.status).to_lowercase(),
                p.amount.value().to_string(),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }

    fn write_enrollments(&mut self, enrollments: &[Enrollment]) -> Result<()> {
        let mut csv = csv::Writer::from_writer(&mut self.writer);
        csv.write_record(["student", "course", "status", "method"])?;
        for e in enrollments {
            csv.write_record([
                e.student.to_string(),
                e.course.to_string(),
                format!("{:?}", e.payment_status).to_lowercase(),
                format!("{:?}", e.payment_method).to_lowercase(),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }

    fn write_attempts(&mut self, attempts: &[Attempt]) -> Result<()> {
        let mut csv = csv::Writer::from_writer(&mut self.writer);
        csv.write_record([
            "attempt",
            "test",
            "student",
            "number",
            "marks",
            "total",
            "percentage",
            "passed",
        ])?;
        for a in attempts {
            csv.write_record([
                a.id.to_string(),
                a.test.to_string(),
                a.student.to_string(),
                a.attempt_number.to_string(),
                a.marks_obtained.to_string(),
                a.total_marks.to_string(),
                a.percentage.to_string(),
                a.is_passed.to_string(),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }
}
