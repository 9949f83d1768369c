use askama::Template;
use askama_web::WebTemplate;

use crate::bookings::Booking;
use crate::catalog::CategoryCount;
use crate::stations::GroundStation;

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub availability: String,
    pub satellite_count: usize,
    pub loaded_at: String,
    pub failed_sources: Vec<String>,
    pub categories: Vec<CategoryCount>,
    pub stations: Vec<GroundStation>,
    pub bookings: Vec<Booking>,
}
