// Prompts for turning noisy bill text into a BillDraft

use crate::directory::OwnerDirectory;
use crate::schema::BillDraft;

pub const SYSTEM_PROMPT_BILL: &str = r#"
You are a parser for T-Mobile bills. The input is noisy text extracted from a PDF.

## RULES
- Month and year come ONLY from the "bill issue date". Do not take them from anywhere else.
- Read one-time charges ONLY from the "THIS BILL SUMMARY" section.
- `plan_total` is the total plan amount for the account.
- Divide the plan amount equally between all lines; put each line's portion in `plan_charge`.
- `equipment_charge` and `one_time_charge` belong to the line they appear under.
- Use plain numbers for amounts (no currency symbols). Use 0 when a line has no such charge.
- Include every phone line listed on the bill, even if its owner is unknown to you.

## OUTPUT FORMAT
Return ONLY a JSON object matching this schema, with no commentary:
"#;

pub fn system_prompt() -> String {
    format!("{}\n{}", SYSTEM_PROMPT_BILL.trim(), BillDraft::json_schema())
}

pub fn bill_prompt(text: &str, directory: &OwnerDirectory) -> String {
    let mut prompt = String::from("Phone number to owner mapping:\n");
    for entry in directory.entries() {
        prompt.push_str(&format!("{} - {}\n", entry.phone_number, entry.owner));
    }
    prompt.push_str("\nInput text:\n");
    prompt.push_str(text);
    prompt
}
