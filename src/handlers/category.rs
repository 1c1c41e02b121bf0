use axum::{extract::State, Json};

use crate::models::{CategoryEntry, CategoryKind};
use crate::AppState;

/// GET /api/categories/subjects
pub async fn list_subjects(State(state): State<AppState>) -> Json<Vec<CategoryEntry>> {
    Json(state.catalog.categories(CategoryKind::Subject))
}

/// GET /api/categories/grades
pub async fn list_grades(State(state): State<AppState>) -> Json<Vec<CategoryEntry>> {
    Json(state.catalog.categories(CategoryKind::Grade))
}

/// GET /api/categories/semesters
pub async fn list_semesters(State(state): State<AppState>) -> Json<Vec<CategoryEntry>> {
    Json(state.catalog.categories(CategoryKind::Semester))
}
