use crate::domain::model::{GenerationRequest, HandoutText, ServiceRecord, VisitorContext};

pub const SYSTEM_INSTRUCTION: &str = "You write clear, friendly, low-literacy handouts.";

pub const DEFAULT_TEMPERATURE: f32 = 0.4;
pub const DEFAULT_MAX_TOKENS: u32 = 600;

// Fixed template. Address rule: only a leading house number may be synthesized.
const INSTRUCTIONS: &str = r#"
You are helping a front-line worker at an Indigenous community centre
write a simple, kind handout about local services.

Write in clear, plain English (around grade 6 reading level).

IMPORTANT RULES:

1. Reassurance opening
   - Start with ONE short sentence that welcomes and reassures the visitor.

2. Cards per service
   - Then, for each service, write a small "card" in this structure:

     [emoji] Service name
     • What it offers (1–2 short lines)
     • When to go TODAY (use the hours_today field)
     • Where: a street-style address with a number
     • Who it is for / eligibility (if important)

   - Put a blank line between cards so they look like separate boxes.
   - Only describe the services listed above. Do not add other services.

3. Emoji use
   - Start each service card with an emoji that roughly matches the service, for example:
       Food = 🍽️
       Health & Wellness = 🩺
       Mental Health = 🧠
       Housing & Shelter = 🏠
       Clothes & Hygiene = 🧥
       Work / Employment = 💼
       Family & Children = 👨‍👩‍👧
       Culture / Community = 🌿
   - If you are not sure, use a neutral emoji like ⭐.

4. Address rule (VERY IMPORTANT)
   - Use the address field from the data when possible.
   - If the address does NOT start with a street number (like "123"), add a
     simple, generic one so it looks like a complete address,
     e.g. change "Main Street" into "123 Main Street".
   - Do NOT invent apartment numbers, unit numbers, building names, or people names.
   - The address only needs to *look* like a real address. It must NOT identify anyone.

5. Safety and tone
   - Use short sentences.
   - Be warm but not childish.
   - Never add personal details about the visitor.

6. Closing line
   - End with one short sentence like:
     "You can always come back to the centre if you need more help."
"#;

fn context_line(context: &VisitorContext) -> String {
    format!(
        "Visitor context: age_group={}, language={}, needs={}, housing_status={}.\n\n",
        context.age_group,
        context.language,
        context.needs_joined(", "),
        context.housing_status
    )
}

fn service_line(position: usize, service: &ServiceRecord) -> String {
    format!(
        "{}. name={} | description={} | hours_today={} | address={} | eligibility={}\n",
        position,
        service.name,
        service.description,
        service.hours_today,
        service.address,
        service.eligibility
    )
}

pub fn build_prompt(context: &VisitorContext, services: &[ServiceRecord]) -> String {
    let mut prompt = context_line(context);
    prompt.push_str("Relevant services (with raw data from the tool):\n");
    for (index, service) in services.iter().enumerate() {
        prompt.push_str(&service_line(index + 1, service));
    }
    prompt.push('\n');
    prompt.push_str(INSTRUCTIONS);
    prompt
}

pub fn build_request(
    context: &VisitorContext,
    services: &[ServiceRecord],
    temperature: f32,
    max_tokens: u32,
) -> GenerationRequest {
    GenerationRequest {
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        prompt: build_prompt(context, services),
        temperature,
        max_tokens,
    }
}

/// Splits generated text into paragraphs on blank lines.
pub fn paragraphs(raw: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in raw.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                result.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        result.push(current.join("\n"));
    }
    result
}

/// First paragraph is the intro, last (when there are two or more) the closing.
/// The middle paragraphs repeat the service cards and are dropped.
pub fn parse_generated_text(raw: &str) -> HandoutText {
    let mut parts = paragraphs(raw);
    match parts.len() {
        0 => HandoutText::default(),
        1 => HandoutText {
            intro: parts.remove(0).trim().to_string(),
            closing: String::new(),
        },
        _ => {
            let closing = parts.pop().unwrap_or_default().trim().to_string();
            HandoutText {
                intro: parts.remove(0).trim().to_string(),
                closing,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AgeGroup, HousingStatus, NeedCategory, TargetAge};

    fn service(id: u32, name: &str) -> ServiceRecord {
        ServiceRecord {
            id,
            name: name.to_string(),
            description: "Hot meals".to_string(),
            category: "food".to_string(),
            languages: vec!["English".to_string()],
            target_age: TargetAge::All,
            hours_today: "11:00-13:00".to_string(),
            address: "Main Street".to_string(),
            eligibility: "Everyone".to_string(),
        }
    }

    #[test]
    fn test_prompt_lists_context_and_services_in_order() {
        let context = VisitorContext::new(
            AgeGroup::From18To29,
            "Cree",
            HousingStatus::Shelter,
            [NeedCategory::Food, NeedCategory::Housing],
        );
        let prompt = build_prompt(&context, &[service(1, "Soup Kitchen"), service(2, "Pantry")]);

        assert!(prompt.starts_with(
            "Visitor context: age_group=18-29, language=Cree, needs=food, housing, housing_status=Shelter."
        ));
        let first = prompt.find("1. name=Soup Kitchen").unwrap();
        let second = prompt.find("2. name=Pantry").unwrap();
        assert!(first < second);
        assert!(prompt.contains("hours_today=11:00-13:00 | address=Main Street"));
        assert!(prompt.contains("grade 6 reading level"));
        assert!(prompt.contains("Do NOT invent apartment numbers"));
    }

    #[test]
    fn test_instruction_block_is_data_independent() {
        let context = VisitorContext::new(
            AgeGroup::Over55,
            "French",
            HousingStatus::NotSpecified,
            [NeedCategory::Culture],
        );
        let a = build_prompt(&context, &[service(1, "A")]);
        let b = build_prompt(&context, &[service(1, "A"), service(2, "B")]);
        assert!(a.ends_with(INSTRUCTIONS));
        assert!(b.ends_with(INSTRUCTIONS));
    }

    #[test]
    fn test_parse_intro_and_closing() {
        let raw = "Welcome, we are glad you came.\n\n🍽️ Soup Kitchen\n• Hot meals\n\n  \n🏠 Shelter\n• Beds\n\nYou can always come back to the centre.\n";
        let text = parse_generated_text(raw);
        assert_eq!(text.intro, "Welcome, we are glad you came.");
        assert_eq!(text.closing, "You can always come back to the centre.");
    }

    #[test]
    fn test_parse_single_paragraph_has_no_closing() {
        let text = parse_generated_text("Only one line here.");
        assert_eq!(text.intro, "Only one line here.");
        assert!(text.closing.is_empty());
    }

    #[test]
    fn test_parse_empty_text() {
        assert_eq!(parse_generated_text("  \n\n "), HandoutText::default());
    }
}
