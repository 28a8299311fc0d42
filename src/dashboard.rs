use crate::action::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Portal,
    Ai,
    Gemini,
}

impl Section {
    pub fn label(self) -> &'static str {
        match self {
            Section::Portal => "VTOP",
            Section::Ai => "AI",
            Section::Gemini => "GEMINI",
        }
    }
}

/// What activating a card does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardTarget {
    Run(Action),
    OpenChat,
    OpenVoice,
}

#[derive(Debug, Clone)]
pub struct Card {
    pub section: Section,
    pub title: &'static str,
    pub description: &'static str,
    pub target: CardTarget,
}

impl Card {
    fn portal(title: &'static str, description: &'static str, command: &str) -> Self {
        Self {
            section: Section::Portal,
            title,
            description,
            target: CardTarget::Run(Action::direct(command)),
        }
    }

    fn ai(title: &'static str, description: &'static str, feature: &str) -> Self {
        Self {
            section: Section::Ai,
            title,
            description,
            target: CardTarget::Run(Action::ai(feature)),
        }
    }

    fn gemini(title: &'static str, description: &'static str, feature: &str) -> Self {
        Self {
            section: Section::Gemini,
            title,
            description,
            target: gemini_target(feature, None),
        }
    }
}

/// `chatbot` and `voice` open their panels instead of calling the backend.
pub fn gemini_target(feature: &str, mode: Option<String>) -> CardTarget {
    match feature {
        "chatbot" => CardTarget::OpenChat,
        "voice" => CardTarget::OpenVoice,
        other => CardTarget::Run(Action::gemini(other, mode)),
    }
}

pub const AI_FEATURES: &[&str] = &[
    "all",
    "attendance_calculator",
    "grade_predictor",
    "cgpa_analyzer",
    "attendance_recovery",
    "exam_readiness",
    "study_allocator",
    "performance_analyzer",
    "target_planner",
    "weakness_identifier",
];

pub const SMART_COMMANDS: &[&str] = &[
    "attendance_advice",
    "performance_overview",
    "focus_advisor",
    "exam_prediction",
];

pub fn catalog() -> Vec<Card> {
    vec![
        Card::portal("Profile", "Student profile", "profile"),
        Card::portal("Marks", "Marks for the semester", "marks view"),
        Card::portal("Grades", "Grades for the semester", "grades view"),
        Card::portal("CGPA", "CGPA details", "cgpa view"),
        Card::portal("Attendance", "Attendance calculator", "attendance calculator"),
        Card::portal("Timetable", "Class timetable", "timetable"),
        Card::portal("Exams", "Exam schedule", "exams"),
        Card::portal("Assignments", "Digital assignments", "da"),
        Card::portal("Receipts", "Fee receipts", "receipts"),
        Card::portal("Hostel", "Hostel details", "hostel"),
        Card::portal("Library", "Library dues", "library-dues"),
        Card::portal("Leave", "Leave status", "leave"),
        Card::portal("Nightslip", "Nightslip status", "nightslip"),
        Card::portal("Messages", "Class messages", "msg"),
        Card::portal("Calendar", "Academic calendar", "calendar"),
        Card::portal("Allocation", "Course allocation", "course-allocation"),
        Card::portal("Facilities", "Campus facilities", "facility"),
        Card::ai("Run All AI", "Every offline analysis", "all"),
        Card::ai("Attendance Plan", "Classes you can skip", "attendance_calculator"),
        Card::ai("Grade Predictor", "Predicted grades", "grade_predictor"),
        Card::ai("CGPA Analyzer", "CGPA impact", "cgpa_analyzer"),
        Card::ai("Attendance Recovery", "Get back above 75%", "attendance_recovery"),
        Card::ai("Exam Readiness", "How ready you are", "exam_readiness"),
        Card::ai("Study Allocator", "Split your study hours", "study_allocator"),
        Card::ai("Performance", "Academic trends", "performance_analyzer"),
        Card::ai("Target Planner", "Scores needed for a target", "target_planner"),
        Card::ai("Weak Spots", "Subjects needing work", "weakness_identifier"),
        Card::gemini("Insights", "Deep performance analysis", "insights"),
        Card::gemini("Career", "Career guidance", "career"),
        Card::gemini("Study Plan", "Optimized study plan", "study-plan"),
        Card::gemini("Study Guide", "Study guide generator", "study-guide"),
        Card::gemini("Chatbot", "Ask about your academics", "chatbot"),
        Card::gemini("Voice", "Voice commands", "voice"),
    ]
}
