use serde::{Deserialize, Serialize};

/// Vínculo professor-aluno; `link_id` é a chave do par
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherStudent {
    pub link_id: String,
    pub teacher_id: String,
    pub student_id: String,
    pub created_at: i64,
}

impl TeacherStudent {
    pub fn new(teacher_id: &str, student_id: &str, now: i64) -> Self {
        TeacherStudent {
            link_id: link_id(teacher_id, student_id),
            teacher_id: teacher_id.to_string(),
            student_id: student_id.to_string(),
            created_at: now,
        }
    }
}

pub fn link_id(teacher_id: &str, student_id: &str) -> String {
    format!("{}_{}", teacher_id, student_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_id_is_ordered_pair() {
        let link = TeacherStudent::new("prof", "aluno", 5);
        assert_eq!(link.link_id, "prof_aluno");
        assert_ne!(link_id("prof", "aluno"), link_id("aluno", "prof"));
    }
}
