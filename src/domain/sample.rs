//! Built-in example scripts
//!
//! The hippo quiz: a buttons post asking for the hippo's colour, each button
//! leading somewhere different and every branch but one looping back.

use std::path::Path;

use super::button::Button;
use super::content::{Content, ContentError};
use super::media::MediaConverter;
use super::post::PostId;
use super::script::Script;
use super::transition::Condition;

pub const QUESTION: &str = "What color is the hippo?";

/// Names of the posts in the hippo scripts
pub mod names {
    pub const QUESTION: &str = "question";
    pub const NO_WAY: &str = "no_way";
    pub const CARTOON: &str = "cartoon";
    pub const GALLERY: &str = "gallery";
    pub const FAREWELL: &str = "farewell";
    pub const HANDOUT: &str = "handout";
    pub const ROUND: &str = "round";
}

fn panel() -> (Button, Button, Button, Content) {
    let gray = Button::new("Gray");
    let pink = Button::new("Pink");
    let green = Button::new("Green");
    let content = Content::buttons(QUESTION, vec![gray.clone(), pink.clone(), green.clone()]);
    (gray, pink, green, content)
}

// names are distinct literals, so add_named cannot fail here
fn add(script: &mut Script, name: &str, content: Content) -> PostId {
    script
        .add_named(name, content)
        .unwrap_or_else(|_| unreachable!("duplicate sample post name {name}"))
}

/// Text-only hippo quiz, runnable without any media files
pub fn hippo() -> Script {
    let mut script = Script::new();
    let (gray, pink, green, content) = panel();

    let question = add(&mut script, names::QUESTION, content);
    let no_way = add(&mut script, names::NO_WAY, Content::text("Well no, of course not"));
    let cartoon = add(&mut script, names::CARTOON, Content::text("Only in cartoons 😊"));
    let gallery = add(
        &mut script,
        names::GALLERY,
        Content::text("Real hippos are gray. Say goodbye when you are done looking."),
    );
    let farewell = add(&mut script, names::FAREWELL, Content::text("Goodbye!"));

    let links = [
        (question, cartoon, Condition::button(&pink)),
        (question, gallery, Condition::button(&gray)),
        (question, no_way, Condition::button(&green)),
        (no_way, question, Condition::Unconditional),
        (cartoon, question, Condition::Unconditional),
        (gallery, farewell, Condition::exact("goodbye")),
        (gallery, farewell, Condition::keyword("bye")),
    ];
    for (from, to, condition) in links {
        if script.add_next(from, to, condition).is_err() {
            unreachable!("sample links only refer to posts added above");
        }
    }
    script
}

/// The full hippo quiz with a round video, a document and a photo group
///
/// Expects `face.mp4`, `handout.docx`, `hippo1.jpg` and `hippo2.png` in
/// `media_dir`.
pub fn hippo_with_media(
    media_dir: &Path,
    round_side: u32,
    converter: &dyn MediaConverter,
) -> Result<Script, ContentError> {
    let (gray, pink, green, content) = panel();

    let round = Content::round(media_dir.join("face.mp4"), round_side, converter)?;
    let handout = Content::doc(media_dir.join("handout.docx"))?;
    let gallery = Content::group(vec![
        Content::image(media_dir.join("hippo1.jpg"))?,
        Content::image(media_dir.join("hippo2.png"))?,
        Content::text("Real hippos are gray"),
    ])?;

    let mut script = Script::new();
    let question = add(&mut script, names::QUESTION, content);
    let no_way = add(&mut script, names::NO_WAY, Content::text("Well no, of course not"));
    let cartoon = add(&mut script, names::CARTOON, Content::text("Only in cartoons 😊"));
    let gallery = add(&mut script, names::GALLERY, gallery);
    let handout = add(&mut script, names::HANDOUT, handout);
    let round = add(&mut script, names::ROUND, round);

    let links = [
        (question, cartoon, Condition::button(&pink)),
        (question, gallery, Condition::button(&gray)),
        (question, no_way, Condition::button(&green)),
        (no_way, handout, Condition::Unconditional),
        (handout, question, Condition::Unconditional),
        (cartoon, round, Condition::Unconditional),
        (round, question, Condition::Unconditional),
        (gallery, question, Condition::keyword("again")),
    ];
    for (from, to, condition) in links {
        if script.add_next(from, to, condition).is_err() {
            unreachable!("sample links only refer to posts added above");
        }
    }
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::NoopConverter;
    use crate::domain::session::{Session, Step};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn hippo_pink_then_pink_again() {
        let script = hippo();
        let question = script.id_of(names::QUESTION).unwrap();
        let cartoon = script.id_of(names::CARTOON).unwrap();
        let mut session = Session::new(&script).unwrap();

        assert_eq!(session.press("pink"), Step::Moved(cartoon));

        let live: Vec<_> = session
            .live_buttons(question)
            .iter()
            .map(|b| b.label())
            .collect();
        assert_eq!(live, vec!["Gray", "Green"]);

        assert_eq!(session.advance(None), Step::Moved(question));
        assert_eq!(session.press("pink"), Step::Waiting);
        assert_eq!(session.current(), question);
    }

    #[test]
    fn hippo_gray_ends_on_goodbye() {
        let script = hippo();
        let gallery = script.id_of(names::GALLERY).unwrap();
        let farewell = script.id_of(names::FAREWELL).unwrap();
        let mut session = Session::new(&script).unwrap();

        assert_eq!(session.press("GRAY"), Step::Moved(gallery));
        assert_eq!(session.advance(None), Step::Waiting);
        assert_eq!(session.advance(Some("ok, Bye then")), Step::Moved(farewell));
        assert_eq!(session.advance(None), Step::Finished);
    }

    #[test]
    fn hippo_structure() {
        let script = hippo();
        let farewell = script.id_of(names::FAREWELL).unwrap();
        assert_eq!(script.len(), 5);
        assert_eq!(script.reachable().len(), 5);
        assert_eq!(
            script.check(),
            vec![crate::domain::Finding::DeadEnd { post: farewell }]
        );
    }

    #[test]
    fn media_sample_needs_files() {
        let dir = TempDir::new().unwrap();
        assert!(hippo_with_media(dir.path(), 480, &NoopConverter).is_err());

        for name in ["face.mp4", "handout.docx", "hippo1.jpg", "hippo2.png"] {
            fs::write(dir.path().join(name), b"data").unwrap();
        }
        let script = hippo_with_media(dir.path(), 240, &NoopConverter).unwrap();
        assert_eq!(script.len(), 6);
        assert!(script.check().is_empty());

        let handout = script.id_of(names::HANDOUT).unwrap();
        let round = script.id_of(names::ROUND).unwrap();
        assert!(matches!(script[handout].content, Content::Doc { .. }));
        assert!(matches!(script[round].content, Content::Round { side: 240, .. }));

        // green goes through the handout, pink through the round video
        let mut session = Session::new(&script).unwrap();
        session.press("green");
        assert_eq!(session.advance(None), Step::Moved(handout));
        session.reset().unwrap();
        session.press("pink");
        assert_eq!(session.advance(None), Step::Moved(round));
    }
}
