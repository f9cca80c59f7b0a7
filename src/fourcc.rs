use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else {
            None
        }
    }

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }

    /// Case-insensitive glob match over the four type-code characters.
    /// `*` matches zero or more characters, `?` matches exactly one.
    pub fn matches_glob(&self, pattern: &str) -> bool {
        glob_match(pattern.as_bytes(), &self.0)
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

/// Box identity: a plain 4CC, or the 16-byte user type carried by `uuid`
/// boxes (the GUID replaces the 4CC as the box's true type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxKey {
    FourCC(FourCC),
    Uuid([u8; 16]),
}

impl BoxKey {
    pub fn fourcc(&self) -> Option<FourCC> {
        match self {
            BoxKey::FourCC(cc) => Some(*cc),
            BoxKey::Uuid(_) => None,
        }
    }

    pub fn matches_glob(&self, pattern: &str) -> bool {
        match self {
            BoxKey::FourCC(cc) => cc.matches_glob(pattern),
            // GUID keys are addressed exactly, never by glob.
            BoxKey::Uuid(_) => false,
        }
    }
}

impl fmt::Display for BoxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoxKey::FourCC(cc) => write!(f, "{cc}"),
            BoxKey::Uuid(u) => write!(f, "uuid:{}", hex::encode(u)),
        }
    }
}

fn eq_ci(a: u8, b: u8) -> bool {
    a.eq_ignore_ascii_case(&b)
}

fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    // Iterative matcher with single-star backtracking.
    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || eq_ci(pattern[p], text[t])) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}
