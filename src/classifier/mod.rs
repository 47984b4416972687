use once_cell::sync::Lazy;

/// A category scores when its keywords appear in the input; keywords
/// longer than average carry proportionally more weight.
const KEYWORD_WEIGHT_DIVISOR: f32 = 3.0;
/// Categories at or below this normalized score are noise, not signal.
const MIN_CATEGORY_SCORE: f32 = 0.5;

/// Concern categories with their trigger keywords, ordered by how often
/// they come up. Order matters: ties in score keep table order.
static CATEGORY_KEYWORDS: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            "관계",
            vec![
                "가족", "부모", "자녀", "형제", "자매", "친구", "연인", "남편", "아내", "결혼",
                "이혼", "갈등", "다툼", "관계", "사랑", "미움", "용서", "배신", "신뢰", "소통",
                "이해", "외로움", "고립",
            ],
        ),
        (
            "진로",
            vec![
                "진로", "직업", "취업", "직장", "회사", "사업", "창업", "학교", "공부", "시험",
                "성적", "진학", "대학", "전공", "선택", "결정", "미래", "꿈", "목표", "포기",
                "실패", "성공",
            ],
        ),
        (
            "신앙",
            vec![
                "하나님", "예수", "성령", "기도", "예배", "교회", "믿음", "신앙", "구원", "죄",
                "회개", "감사", "찬양", "성경", "말씀", "은혜", "축복", "시험", "연단", "순종",
                "의심", "불신",
            ],
        ),
        (
            "감정",
            vec![
                "우울", "슬픔", "기쁨", "행복", "분노", "화", "불안", "걱정", "두려움", "무서움",
                "스트레스", "좌절", "절망", "희망", "평안", "위로", "격려", "감정", "마음",
                "정신",
            ],
        ),
        (
            "윤리",
            vec![
                "선악", "옳고", "그름", "도덕", "윤리", "양심", "정직", "거짓말", "속임", "진실",
                "정의", "공의", "공정", "불의", "부정", "타락", "유혹", "시험", "선택", "결정",
                "가치관",
            ],
        ),
        (
            "건강",
            vec![
                "건강", "질병", "병", "아픔", "고통", "치료", "의사", "병원", "약", "수술",
                "회복", "죽음", "생명", "몸", "정신", "마음", "휴식", "피로", "스트레스", "운동",
                "식사",
            ],
        ),
        (
            "경제",
            vec![
                "돈", "재정", "경제", "가난", "부", "가난한", "부자", "빚", "대출", "투자",
                "사업", "직장", "월급", "수입", "지출", "절약", "후원", "기부", "헌금", "물질",
                "재물",
            ],
        ),
    ]
});

pub fn category_names() -> Vec<&'static str> {
    CATEGORY_KEYWORDS.iter().map(|(name, _)| *name).collect()
}

pub fn is_known_category(name: &str) -> bool {
    CATEGORY_KEYWORDS.iter().any(|(cat, _)| *cat == name)
}

/// Keyword-weighted multi-label scorer over the static category table.
/// Stateless; a unit struct so the coordinator can hold one per the
/// same shape as the matchers.
#[derive(Debug, Default, Clone, Copy)]
pub struct TopicClassifier;

impl TopicClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Score the input against every category and return those above
    /// the cutoff, descending. Each keyword found as a substring of the
    /// lowercased input adds `keyword_chars / 3`; the category total is
    /// normalized by input chars and scaled by 100. Pure: same text,
    /// same output, always.
    pub fn classify(&self, text: &str) -> Vec<(&'static str, f32)> {
        let text = text.to_lowercase();
        let text_chars = text.chars().count();
        if text_chars == 0 {
            return Vec::new();
        }

        let mut scores: Vec<(&'static str, f32)> = CATEGORY_KEYWORDS
            .iter()
            .map(|(category, keywords)| {
                let raw: f32 = keywords
                    .iter()
                    .filter(|kw| text.contains(*kw))
                    .map(|kw| kw.chars().count() as f32 / KEYWORD_WEIGHT_DIVISOR)
                    .sum();
                (*category, raw / text_chars as f32 * 100.0)
            })
            .collect();

        // Stable sort keeps table order for tied scores.
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.retain(|(_, score)| *score > MIN_CATEGORY_SCORE);
        scores
    }
}
