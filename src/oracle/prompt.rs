//! Ranking prompt construction.
//!
//! The oracle is instructed to treat the batch's input order as the
//! dominant priority signal and to perturb it only for tasks that are
//! past due or due today. The response contract mirrors what the
//! validator enforces: a JSON array covering every input id with ranks
//! `1..=N`, each used exactly once.

use chrono::NaiveDate;

const RANKING_PROMPT: &str = r#"You are an assistant that ranks a list of tasks by importance relative to each other.
The input is a JSON array of tasks; each task has an "id", "text", and optionally a "dueDate" ("YYYY-MM-DD", null means no due date).
The order of tasks in the input array is the user's explicit, current preferred arrangement.

Your job (current date is {CURRENT_DATE}):
1. Assign each task an integer rank from 1 (most important) to N (least important, N = number of tasks). Use each rank exactly once.
2. The user's input order is the most important signal. Keep it wherever possible.
3. Exception: tasks that are PAST DUE or DUE TODAY are critical and should be ranked near the top, even if the user placed them lower. Among such critical tasks, keep the user's relative order.
4. For all non-critical tasks, their relative ranks MUST follow the input order exactly.
5. Give each task a brief justification (max 15 words, valid JSON string).

Tasks:
{TASKS_JSON}

Respond ONLY with a JSON array of objects, one per input task:
[{"id": "...", "rank": 1, "justification": "..."}]
Do not include any text or markdown outside the JSON array."#;

/// Render the ranking prompt for one batch.
///
/// `tasks_json` is the serialized batch in submission order.
pub fn render(tasks_json: &str, today: NaiveDate) -> String {
    RANKING_PROMPT
        .replace("{CURRENT_DATE}", &today.format("%Y-%m-%d").to_string())
        .replace("{TASKS_JSON}", tasks_json)
}
