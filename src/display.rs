use crate::model::{EvaluationParameter, Group, Member};
use crate::notify::Notifier;
use std::io::Write;

pub fn display_group(g: &Group) {
    println!("{} [{}]", g.name, g.id);
    if !g.project_title.is_empty() {
        println!("  Project: {}", g.project_title);
    }
    if !g.project_description.is_empty() {
        println!("  Description: {}", g.project_description);
    }
    if !g.project_technology.is_empty() {
        println!("  Technology: {}", g.project_technology);
    }
    if let Some(year) = g.year {
        println!("  Year: {year}");
    }
    if let Some(division) = &g.division {
        println!(
            "  Division: {} semester {}",
            division.course, division.semester
        );
    }
    match &g.guide {
        Some(guide) => println!("  Guide: {}", guide.name),
        None => println!("  Guide: (none)"),
    }
    display_members(&format!("Members ({})", g.member_count()), &g.members);
}

pub fn display_members(title: &str, members: &[Member]) {
    println!("{title}:");
    if members.is_empty() {
        println!("  (none)");
    }
    for (n, m) in members.iter().enumerate() {
        println!("  {}. {} [{}]", n + 1, m, m.id);
    }
}

pub fn display_parameters(parameters: &[EvaluationParameter]) {
    let total: u32 = parameters.iter().map(|p| p.marks).sum();
    println!("Evaluation parameters (total {total} marks):");
    for p in parameters {
        print!("  - {} [{}]: {} marks", p.name, p.id, p.marks);
        if !p.description.is_empty() {
            print!(" ({})", p.description);
        }
        println!();
    }
}

pub fn display_notification(notifier: &Notifier) {
    if let Some(notification) = notifier.current() {
        println!("{notification}");
    }
}

/// Write the roster of a group as `name,enrollment` CSV records.
pub fn write_members_csv<W: Write>(g: &Group, writer: W) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(["name", "enrollment"])?;
    for m in &g.members {
        w.write_record([m.name.as_str(), m.enrollment_number.as_str()])?;
    }
    w.flush()?;
    Ok(())
}

#[test]
fn test_members_csv() {
    let g = Group {
        members: vec![
            Member::new("s1", "Asha", "EN001"),
            Member::new("s2", "Ravi, Jr.", "EN002"),
        ],
        ..Group::default()
    };
    let mut out = Vec::new();
    write_members_csv(&g, &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "name,enrollment\nAsha,EN001\n\"Ravi, Jr.\",EN002\n"
    );
}
