// pdf.rs
// Invoice document rendering. The pipeline consumes the trait; the
// production implementation compiles a typst source with the `typst`
// binary (TYPST_BIN) and drops the PDF at a deterministic path keyed by
// billing period, pg and room, which the download endpoint reconstructs.

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use rand::{Rng, distr::Alphanumeric};

use crate::{errors::ApiError, models::Invoice};

pub trait InvoiceRenderer: Send + Sync {
    fn render(&self, invoice: &Invoice) -> Result<PathBuf, ApiError>;
}

/// Deterministic document location,
/// `{base}/{monthYear}/{pgId}/invoice_{roomNo}.pdf`. Download endpoints
/// rebuild this path instead of storing a pointer to it.
pub fn invoice_pdf_path(base: &Path, month_year: &str, pg_id: &str, room_no: &str) -> PathBuf {
    base.join(month_year)
        .join(pg_id)
        .join(format!("invoice_{room_no}.pdf"))
}

pub struct TypstRenderer {
    bin: String,
    out_dir: PathBuf,
}

impl TypstRenderer {
    pub fn from_env() -> Self {
        TypstRenderer {
            bin: std::env::var("TYPST_BIN").unwrap_or_else(|_| "typst".to_string()),
            out_dir: PathBuf::from(
                std::env::var("INVOICE_DIR").unwrap_or_else(|_| "invoices".to_string()),
            ),
        }
    }
}

impl InvoiceRenderer for TypstRenderer {
    fn render(&self, invoice: &Invoice) -> Result<PathBuf, ApiError> {
        let output_path = invoice_pdf_path(
            &self.out_dir,
            &invoice.month_year,
            &invoice.pg_id,
            &invoice.room_no,
        );
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| ApiError::Render(format!("cannot create invoice dir: {err}")))?;
        }

        compile_typst(&self.bin, &invoice_source(invoice), &output_path)?;
        Ok(output_path)
    }
}

fn compile_typst(bin: &str, source: &str, output_path: &Path) -> Result<(), ApiError> {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    let tmp_dir = std::env::temp_dir().join(format!("rentdesk-typst-{suffix}"));
    fs::create_dir(&tmp_dir)
        .map_err(|err| ApiError::Render(format!("cannot create temp dir: {err}")))?;

    let input_path = tmp_dir.join("invoice.typ");
    if let Err(err) = fs::write(&input_path, source) {
        let _ = fs::remove_dir_all(&tmp_dir);
        return Err(ApiError::Render(format!("cannot write typst source: {err}")));
    }

    let output = Command::new(bin)
        .arg("compile")
        .arg(&input_path)
        .arg(output_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|err| {
            let _ = fs::remove_dir_all(&tmp_dir);
            if err.kind() == std::io::ErrorKind::NotFound {
                ApiError::Render(format!(
                    "typst binary `{bin}` not found; install it or set TYPST_BIN"
                ))
            } else {
                ApiError::Render(format!("failed to run typst: {err}"))
            }
        })?;

    let _ = fs::remove_dir_all(&tmp_dir);

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ApiError::Render(if stderr.is_empty() {
            "typst compile failed".to_string()
        } else {
            stderr
        }));
    }

    Ok(())
}

fn invoice_source(invoice: &Invoice) -> String {
    let due_date = invoice.due_date.try_to_rfc3339_string().unwrap_or_default();
    format!(
        r##"#set page(paper: "a4", margin: 2cm)
#align(center)[= Rental Invoice]
#align(right)[Invoice No: *{number}*]

== Tenant
- Name: {tenant}
- PG: {pg_name} (id {pg_id})
- Room: {room}

== Charges
#table(
  columns: (1fr, auto),
  [Rent], [{rent:.2}],
  [Maintenance], [{maintenance:.2}],
  [Electricity (main {main_last:.1} -> {main_current:.1}, inverter {inv_last:.1} -> {inv_current:.1}, motor {motor:.1} units at {cpu:.2}/unit, fine {fine:.2})], [{electricity:.2}],
  [*Total due*], [*{total:.2}*],
)

Due date: {due_date}
"##,
        number = invoice.invoice_number,
        tenant = invoice.tenant_name,
        pg_name = invoice.pg_name,
        pg_id = invoice.pg_id,
        room = invoice.room_no,
        rent = invoice.rent,
        maintenance = invoice.maintenance_amount,
        main_last = invoice.main_last_month,
        main_current = invoice.main_current_month,
        inv_last = invoice.inverter_last_month,
        inv_current = invoice.inverter_current_month,
        motor = invoice.motor_units,
        cpu = invoice.cost_per_unit,
        fine = invoice.electricity_fine,
        electricity = invoice.due_electricity_bill,
        total = invoice.total_amount_due,
        due_date = due_date,
    )
}
