// LLM prompt templates for resume analysis.

/// Expected shape of the feedback JSON. Embedded verbatim in the instructions.
pub const FEEDBACK_FORMAT: &str = r#"{
  "overallScore": number,            // 0 - 100
  "ATS": {
    "score": number,                 // suitability for applicant tracking systems
    "tips": [{"type": "good" | "improve", "tip": "string"}]   // 3-4 tips
  },
  "toneAndStyle": {
    "score": number,                 // 0 - 100
    "tips": [{"type": "good" | "improve", "tip": "short title", "explanation": "detailed explanation"}]
  },
  "content": {
    "score": number,
    "tips": [{"type": "good" | "improve", "tip": "short title", "explanation": "detailed explanation"}]
  },
  "structure": {
    "score": number,
    "tips": [{"type": "good" | "improve", "tip": "short title", "explanation": "detailed explanation"}]
  },
  "skills": {
    "score": number,
    "tips": [{"type": "good" | "improve", "tip": "short title", "explanation": "detailed explanation"}]
  }
}"#;

/// Analysis instructions. Replace `{job_title}`, `{job_description}` and
/// `{feedback_format}` before sending.
pub const FEEDBACK_PROMPT_TEMPLATE: &str = r#"You are an expert in ATS (Applicant Tracking Systems) and resume review.
Analyze and rate the attached resume and explain how to improve it.
Scores may be low when the resume is weak. Be thorough: point out every mistake and area for improvement.
Use the job description of the role the candidate is applying for to make the feedback specific.

The job title is: {job_title}
The job description is: {job_description}

Return the feedback using this format:
{feedback_format}

Respond with the JSON object only, without backticks or any other text."#;

pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    fill_template(
        FEEDBACK_PROMPT_TEMPLATE,
        &[
            ("{job_title}", job_title),
            ("{job_description}", job_description),
            ("{feedback_format}", FEEDBACK_FORMAT),
        ],
    )
}

/// Replaces placeholders in a single left-to-right pass over `template`.
/// Substituted text is never scanned again.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        match values.iter().find(|(key, _)| rest.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &rest[key.len()..];
            }
            None => {
                out.push('{');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
