use serde::{Deserialize, Serialize};

use crate::domain::{StudentForm, StudentRecord, Uid};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response. Deployments disagree about the token key name, so all
/// three observed spellings are accepted; `token` wins when several appear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, rename = "accessToken", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}

impl LoginResponse {
    pub fn into_token(self) -> Option<String> {
        self.token
            .or(self.access_token)
            .or(self.jwt)
            .filter(|token| !token.is_empty())
    }
}

/// Body of the latest-UID probe. The scanner bridge has shipped the value
/// under both `uid` and `latestUid`; a missing or empty field means no scan
/// has been seen yet, not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestUidResponse {
    #[serde(default, alias = "latestUid", skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl LatestUidResponse {
    pub fn into_uid(self) -> Option<Uid> {
        self.uid
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(Uid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentRequest {
    pub name: String,
    pub matric_no: String,
    pub email: String,
    pub phone: String,
    pub level: String,
    pub department: String,
    pub uid: Uid,
}

impl RegisterStudentRequest {
    pub fn from_form(form: StudentForm, uid: Uid) -> Self {
        Self {
            name: form.name,
            matric_no: form.matric_no,
            email: form.email,
            phone: form.phone,
            level: form.level,
            department: form.department,
            uid,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterStudentResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentRecord>,
}

/// Roster listing: either `{"students": [...]}` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StudentsResponse {
    Wrapped { students: Vec<StudentRecord> },
    Bare(Vec<StudentRecord>),
}

impl StudentsResponse {
    pub fn into_students(self) -> Vec<StudentRecord> {
        match self {
            StudentsResponse::Wrapped { students } => students,
            StudentsResponse::Bare(students) => students,
        }
    }
}
