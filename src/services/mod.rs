pub mod appraisal_service;
pub mod bsc_service;
pub mod cycle_service;
pub mod demo_generator;
pub mod employee_service;
pub mod engagement_service;
pub mod kpi_service;
pub mod leave_service;
pub mod mood_service;
pub mod settings_service;
pub mod sync_service;
