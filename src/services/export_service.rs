use rust_xlsxwriter::*;

use crate::database::ApplicationListing;
use crate::error::Result;
use crate::utils::time::format_short_date;

pub const SHEET_NAME: &str = "Applications";

pub const HEADERS: [&str; 6] = [
    "Name",
    "Email",
    "Status",
    "Applied Date",
    "Payment Status",
    "Interview Status",
];

const COLUMN_WIDTHS: [f64; 6] = [30.0, 32.0, 14.0, 14.0, 16.0, 18.0];

/// One spreadsheet row, in `HEADERS` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub name: String,
    pub email: String,
    pub status: String,
    pub applied_date: String,
    pub payment_status: String,
    pub interview_status: String,
}

impl ExportRow {
    pub fn cells(&self) -> [&str; 6] {
        [
            &self.name,
            &self.email,
            &self.status,
            &self.applied_date,
            &self.payment_status,
            &self.interview_status,
        ]
    }
}

impl From<&ApplicationListing> for ExportRow {
    fn from(listing: &ApplicationListing) -> Self {
        let app = &listing.application;
        let (name, email) = match &listing.applicant {
            Some(applicant) => (applicant.name.clone(), applicant.email.clone()),
            None => (app.applicant_name(), String::new()),
        };
        Self {
            name,
            email,
            status: app.application_status.label().to_string(),
            applied_date: format_short_date(app.created_at),
            payment_status: app.payment.status.label().to_string(),
            interview_status: app.interview.report_label().to_string(),
        }
    }
}

pub struct ExportService;

impl ExportService {
    pub fn rows(listings: &[ApplicationListing]) -> Vec<ExportRow> {
        listings.iter().map(ExportRow::from).collect()
    }

    /// Header row then one row per listing, in the order given.
    pub fn generate_applications_xlsx(listings: &[ApplicationListing]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        let border_color = Color::RGB(0xE2E8F0);
        let header_format = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(0x0F172A))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
            worksheet.set_column_width(col as u16, *width)?;
        }
        for (col, header) in HEADERS.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        }

        for (idx, row) in Self::rows(listings).iter().enumerate() {
            let r = idx as u32 + 1;
            let bg = if idx % 2 == 0 {
                Color::RGB(0xF8FAFC)
            } else {
                Color::White
            };
            let cell_format = Format::new()
                .set_background_color(bg)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);

            for (col, value) in row.cells().iter().enumerate() {
                worksheet.write_string_with_format(r, col as u16, *value, &cell_format)?;
            }
        }

        worksheet.set_freeze_panes(1, 0)?;
        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}
