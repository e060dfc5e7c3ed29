pub mod extract;
pub mod gemini;
pub mod prompts;
pub mod report;

pub use gemini::GeminiClient;
pub use report::ReportService;
