use crate::core::messages::Locale;
use serde_json::{json, Value};

pub fn story_prompt(page_count: usize, locale: Locale) -> String {
    match locale {
        Locale::En => format!(
            "Write a {} part story for a children's book. The story is about a car race between \
             a fast rabbit named \"Swiftfoot\", a slow and determined turtle named \"Pebble\" and \
             a clever cat named \"Sparky\". Their friends who came to cheer them on are a kind \
             bear named \"Fuzzy\", a playful skunk, a strong panther and a big elephant. \
             In simple, childlike language the story should teach handling anger when a car \
             breaks down, the feeling of losing, the joy of winning and why helping friends in \
             hard times matters. Each part of the story is one page of the book and should be \
             about 50 to 80 words long.",
            page_count
        ),
        Locale::Fa => format!(
            "یک داستان {} قسمتی برای کتاب کودکان بنویس. داستان در مورد مسابقه ماشین‌رانی بین یک خرگوش سریع به نام \"تیزپا\"، \
             یک لاک‌پشت آرام و مصمم به نام \"سنگی\" و یک گربه زرنگ به نام \"برقی\" است. دوستانشان که برای تشویق آمده‌اند \
             شامل یک خرس مهربان به نام \"پشمالو\"، یک راسوی بازیگوش، یک پلنگ قوی و یک فیل بزرگ هستند. \
             داستان باید مفاهیم مهمی مانند مدیریت خشم وقتی ماشین خراب می‌شود، حس شکست، شادی پیروزی و اهمیت کمک به دوستان \
             در مواقع سختی را به زبان ساده و کودکانه آموزش دهد. هر قسمت از داستان باید برای یک صفحه از کتاب باشد \
             و حدود 50 تا 80 کلمه باشد.",
            page_count
        ),
    }
}

/// JSON schema the text model must answer with: `[{ page, text }]`.
pub fn story_schema(locale: Locale) -> Value {
    let (page_desc, text_desc) = match locale {
        Locale::En => ("Page number", "Story text for this page"),
        Locale::Fa => ("شماره صفحه", "متن داستان برای این صفحه"),
    };
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "page": { "type": "INTEGER", "description": page_desc },
                "text": { "type": "STRING", "description": text_desc }
            },
            "required": ["page", "text"]
        }
    })
}

/// Image prompt for one page. The character and car descriptions stay fixed so
/// every illustration in the book looks consistent.
pub fn illustration_prompt(story_text: &str) -> String {
    format!(
        "Vibrant and colorful children's book illustration, in a whimsical and charming style. \
         The scene is based on this text: \"{}\".\n\
         The main characters are driving cute, cartoonish racing cars inspired by the design of a BMW Z4 sports car.\n\
         - A cute rabbit is in a bright yellow racing car with the number 1 on it.\n\
         - A friendly turtle is in a sturdy green racing car with the number 7 on it.\n\
         - A clever cat is in a sleek blue racing car with the number 5 on it.\n\n\
         The appearance, color, and design of these specific cars (BMW Z4 inspired, specific colors, and numbers) \
         MUST remain consistent across all generated images.\n\
         Their friends (a bear, skunk, panther, and elephant) might be in the background.\n\
         The art style must be cheerful, friendly, and appealing to young children.\n\
         IMPORTANT: Absolutely no text, letters, or words are allowed in the image. \
         The only numbers visible should be 1, 7, and 5 on their respective cars.",
        story_text
    )
}

pub fn strip_code_blocks(s: &str) -> String {
    let s = s.trim();
    if s.starts_with("```json") {
        s.trim_start_matches("```json").trim_end_matches("```").trim().to_string()
    } else if s.starts_with("```") {
        s.trim_start_matches("```").trim_end_matches("```").trim().to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("[]"), "[]");
        assert_eq!(strip_code_blocks("```json\n[]\n```"), "[]");
        assert_eq!(strip_code_blocks("```\n[]\n```"), "[]");
        assert_eq!(strip_code_blocks("  ```json  \n  []  \n  ```  "), "[]");
    }

    #[test]
    fn test_story_prompt_carries_page_count() {
        assert!(story_prompt(10, Locale::En).starts_with("Write a 10 part story"));
        assert!(story_prompt(7, Locale::Fa).contains("7 قسمتی"));
    }

    #[test]
    fn test_schema_requires_page_and_text() {
        let schema = story_schema(Locale::En);
        assert_eq!(schema["type"], "ARRAY");
        assert_eq!(schema["items"]["required"], json!(["page", "text"]));
    }

    #[test]
    fn test_illustration_prompt_quotes_segment() {
        let prompt = illustration_prompt("The turtle fixes the wheel.");
        assert!(prompt.contains("\"The turtle fixes the wheel.\""));
    }
}
