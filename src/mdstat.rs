//! `/proc/mdstat` Parser
//!
//! RAID setup reads the md status of the target node and picks the array and
//! member disks the RAID faults operate on. Only array header lines matter
//! here; block counts, bitmap and resync progress lines are skipped.

/// One md array from `/proc/mdstat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdArray {
    /// Device path, e.g. `/dev/md0`
    pub device: String,
    /// `active` or `inactive`
    pub state: String,
    /// RAID level (`raid1`, `linear`, ...); inactive arrays have none
    pub level: Option<String>,
    /// Member device paths in role order
    pub members: Vec<String>,
    /// Members flagged `(F)`
    pub failed: Vec<String>,
    /// Members flagged `(S)`
    pub spares: Vec<String>,
}

impl MdArray {
    pub fn is_active(&self) -> bool {
        self.state == "active"
    }

    /// Members in role order, failed and spare disks left out
    pub fn working_members(&self) -> Vec<&str> {
        self.members
            .iter()
            .filter(|m| !self.failed.contains(m) && !self.spares.contains(m))
            .map(String::as_str)
            .collect()
    }
}

struct Member {
    role: u32,
    path: String,
    failed: bool,
    spare: bool,
}

/// Parse every array described in `text`
pub fn parse_mdstat(text: &str) -> Vec<MdArray> {
    text.lines().filter_map(parse_array_line).collect()
}

fn parse_array_line(line: &str) -> Option<MdArray> {
    // Array headers start in column 0 with the md name; continuation lines are indented
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let (name, rest) = line.split_once(" : ")?;
    let name = name.trim();
    if !name.starts_with("md") {
        return None;
    }

    let mut tokens = rest.split_whitespace().peekable();
    let state = tokens.next()?.to_string();
    while let Some(t) = tokens.peek() {
        if t.starts_with('(') {
            tokens.next();
        } else {
            break;
        }
    }

    let level = match tokens.peek() {
        Some(t) if !t.contains('[') => tokens.next().map(str::to_string),
        _ => None,
    };

    let mut members: Vec<Member> = tokens.filter_map(parse_member).collect();
    members.sort_by_key(|m| m.role);

    Some(MdArray {
        device: format!("/dev/{}", name),
        state,
        level,
        failed: members
            .iter()
            .filter(|m| m.failed)
            .map(|m| m.path.clone())
            .collect(),
        spares: members
            .iter()
            .filter(|m| m.spare)
            .map(|m| m.path.clone())
            .collect(),
        members: members.into_iter().map(|m| m.path).collect(),
    })
}

/// `sda1[0]`, `sdb1[1](F)`
fn parse_member(token: &str) -> Option<Member> {
    let open = token.find('[')?;
    let close = token[open..].find(']')? + open;
    let role = token[open + 1..close].parse().ok()?;
    let flags = &token[close + 1..];
    Some(Member {
        role,
        path: format!("/dev/{}", &token[..open]),
        failed: flags.contains("(F)"),
        spare: flags.contains("(S)"),
    })
}
