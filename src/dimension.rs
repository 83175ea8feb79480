//! The four learning style dimensions and their fixed report texts.
//!
//! Every piece of boilerplate that depends on a dimension lives in [`PROFILES`], so the reference
//! table, the summary lines and the strategy lines are all driven by one table.

/// One of the four bipolar learning style axes, in report order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// 信息加工: active vs reflective.
    Processing,
    /// 信息感知: sensing vs intuitive.
    Perception,
    /// 信息输入: visual vs verbal.
    Input,
    /// 内容理解: sequential vs global.
    Understanding,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Processing,
        Dimension::Perception,
        Dimension::Input,
        Dimension::Understanding,
    ];

    pub fn profile(self) -> &'static DimensionProfile {
        &PROFILES[self.index()]
    }

    pub fn category(self) -> &'static str {
        self.profile().category
    }

    /// Header of the signed score column, e.g. `积极/沉思`.
    pub fn score_column(self) -> &'static str {
        self.profile().score_column
    }

    /// Position in [`Dimension::ALL`].
    pub(crate) fn index(self) -> usize {
        match self {
            Dimension::Processing => 0,
            Dimension::Perception => 1,
            Dimension::Input => 2,
            Dimension::Understanding => 3,
        }
    }
}

/// Which end of a dimension a score leans towards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pole {
    Left,
    Right,
}

impl Pole {
    /// Negative scores select the left pole; zero and positive scores the right one.
    pub fn for_score(score: i32) -> Self {
        if score < 0 {
            Pole::Left
        } else {
            Pole::Right
        }
    }
}

/// Strong/medium/weak classification of a score's magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrengthBand {
    Strong,
    Medium,
    Weak,
}

impl StrengthBand {
    pub fn classify(score: i32) -> Self {
        let magnitude = score.unsigned_abs();
        if magnitude >= 9 {
            StrengthBand::Strong
        } else if magnitude <= 3 {
            StrengthBand::Weak
        } else {
            StrengthBand::Medium
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StrengthBand::Strong => "强",
            StrengthBand::Medium => "中",
            StrengthBand::Weak => "弱",
        }
    }
}

/// Texts attached to one pole of a dimension.
#[derive(Debug)]
pub struct PoleProfile {
    /// Short label used in summaries and chart annotations (`积极`).
    pub label: &'static str,
    /// Label used in the reference table (`积极型`).
    pub type_label: &'static str,
    /// Reference table description.
    pub description: &'static str,
    /// Recommended strategy paragraph.
    pub strategy: &'static str,
    /// Header of the column holding this pole's magnitude.
    pub magnitude_column: &'static str,
}

#[derive(Debug)]
pub struct DimensionProfile {
    pub dimension: Dimension,
    pub category: &'static str,
    pub score_column: &'static str,
    pub left: PoleProfile,
    pub right: PoleProfile,
}

impl DimensionProfile {
    pub fn pole(&self, pole: Pole) -> &PoleProfile {
        match pole {
            Pole::Left => &self.left,
            Pole::Right => &self.right,
        }
    }
}

pub static PROFILES: [DimensionProfile; 4] = [
    DimensionProfile {
        dimension: Dimension::Processing,
        category: "信息加工",
        score_column: "积极/沉思",
        left: PoleProfile {
            label: "积极",
            type_label: "积极型",
            description: "通过积极讨论、积极动手和解释给别人听来获取知识；乐于尝试；喜欢协同学习。",
            strategy: "积极学习者：如果您是积极型学习者，在课堂上很少或根本没有时间进行讨论或进行解决问题的活动，\
那么您应该在学习时尝试弥补这些不足。例如在小组中学习，成员轮流向彼此讲解不同的主题。与其他人一起猜测下一次考试会考到什么，\
并弄清楚您将如何作答。如果您找到解决的方法，您将总是更好地掌握接收的信息。",
            magnitude_column: "积极",
        },
        right: PoleProfile {
            label: "沉思",
            type_label: "沉思型",
            description: "安静思考；三思而后行；偏爱独自学习或与固定的搭档共同学习；擅长理论。",
            strategy: "沉思学习者：如果您是沉思型学习者，在课堂上很少或根本没有时间来思考新信息，\
那么您应该在学习时设法弥补这一不足。不要只是简单的阅读或记住材料；定期停下来回顾已读内容并考虑可能存在的问题或其应用。\
您可能会发现用自己的话写一些简短的阅读摘要或课堂笔记会很有用。这样做可能会花费额外的时间，但可以使您更有效地掌握材料。",
            magnitude_column: "沉思",
        },
    },
    DimensionProfile {
        dimension: Dimension::Perception,
        category: "信息感知",
        score_column: "感官/直觉",
        left: PoleProfile {
            label: "感官",
            type_label: "感官型",
            description: "擅长记忆事实；不喜欢复杂和意外；对细节很有耐心；更加实际和谨慎；\
喜欢与现实世界有所联系的知识。",
            strategy: "感官学习者：如果感官型学习者能够看到信息与现实世界的联系，则他们最能理解并记住信息。\
如果您所在的班级中大部分教学材料都是抽象和理论性的，那么您可能会遇到学习困难。向您的老师询问概念和步骤的具体示例，\
并了解如何在实践中应用这些概念。如果老师没有提供足够的细节，请尝试在您的课程教科书或其他参考资料中找到一些细节，\
或者与朋友或同学一起集思广益。",
            magnitude_column: "感官",
        },
        right: PoleProfile {
            label: "直觉",
            type_label: "直觉型",
            description: "擅长发现事物之间的联系；喜欢创新，不喜欢重复；擅长掌握新概念及抽象概念；\
对细节较为粗心。",
            strategy: "直觉学习者：许多大学讲课都是针对直觉型学习者的。但是，如果您是一位直觉型学习者，\
并且碰巧参加了主要涉及记忆和死记硬背公式的课程，那么您可能会感到无聊。向您的老师寻求与事实相联系的解释或理论，\
或尝试自己找到联系。您可能还容易在测试中犯粗心大意的错误，因为您对细节不耐烦并且不喜欢重复（例如检查答案）。\
在开始回答之前，请花一些时间阅读整个问题，并确保检查结果。",
            magnitude_column: "直觉",
        },
    },
    DimensionProfile {
        dimension: Dimension::Input,
        category: "信息输入",
        score_column: "视觉/言语",
        left: PoleProfile {
            label: "视觉",
            type_label: "视觉型",
            description: "喜欢通过可视化的学习资源来获取知识，如视频、图表、概念图等。",
            strategy: "视觉学习者：如果您是视觉学习者，而课程材料主要以言语形式表达的话，请尝试查找图表，草图，\
示意图，照片，流程图或课程材料的任何其他视觉表示形式。询问您的老师，查阅参考书，并查看课程资料是否有任何视频。\
可以准备概念图：通过列出关键点，将其括在方框或圆圈中并在概念之间用箭头画线以显示连接。用荧光笔对笔记进行颜色编码，\
以相同的颜色标注与一个主题相关的所有内容。",
            magnitude_column: "视觉",
        },
        right: PoleProfile {
            label: "言语",
            type_label: "言语型",
            description: "喜欢书面或者口头阐释的学习资源，文本、音频等。",
            strategy: "言语学习者：用自己的文字写出课程材料的摘要或提纲。小组合作特别有效：通过听取同学的解释，\
您可以对材料有所了解，而在进行解释时，您会学到更多。",
            magnitude_column: "言语",
        },
    },
    DimensionProfile {
        dimension: Dimension::Understanding,
        category: "内容理解",
        score_column: "顺序/全局",
        left: PoleProfile {
            label: "顺序",
            type_label: "顺序型",
            description: "喜欢按照逻辑顺序进行学习；依靠部分信息就可以开展工作。",
            strategy: "顺序学习者：大多数大学课程是按顺序教授的。但是，如果您是顺序学习者，\
并且有一位老师从一个主题跳到另一个主题或跳过一些步骤，那么您可能很难跟随和记忆。要求老师补上跳过的步骤，\
或通过查阅参考资料自行补上。在学习时，请花时间按逻辑顺序为自己概述课程材料。从长远来看，这样做可以节省您的时间。\
您还可以尝试通过将学习的每个新主题与已知知识相关联来增强全局思维能力。您可以做的越多，对主题的理解就可能越深入。",
            magnitude_column: "顺序",
        },
        right: PoleProfile {
            label: "全局",
            type_label: "全局型",
            description: "喜欢从整体角度看待问题，会比较倾向于先掌握知识整体的框架，然后再进行深入学习；\
思维比较活跃和发散。",
            strategy: "全局学习者：如果您是一名全局学习者，认识到自己在掌握细节之前，需要先了解主题的全貌是很有\
帮助的。如果您的老师直接投入新的话题而又不花时间去解释它们与您已经知道的事情之间的关系，那么这可能会给您带来麻烦。\
幸运的是，您可以采取一些步骤来帮助您更快地了解全貌。在开始学习书中章节的第一部分之前，请浏览整个章节以获取概述。\
这样做一开始可能很耗时，但可以避免以后再一遍遍读单个部分。您可能会发现，用大块的时间使自己沉浸在单个主题中会比每晚在\
每个主题花很少时间更有效果。尝试要求老师帮助您理解联系或查阅参考文献，将主题与您已经知道的事情联系起来。最重要的是，\
不要对自己失去信心。您最终将了解新材料，一旦您了解了它如何与其他主题和学科联系起来，\
便可以使您以大多数顺序思考者难以想象的方式应用它。",
            magnitude_column: "全局",
        },
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_cover_every_score_exactly_once() {
        for score in -30i32..=30 {
            let magnitude = score.abs();
            let expected = if magnitude >= 9 {
                StrengthBand::Strong
            } else if magnitude <= 3 {
                StrengthBand::Weak
            } else {
                StrengthBand::Medium
            };
            assert_eq!(StrengthBand::classify(score), expected, "score {score}");
        }
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(StrengthBand::classify(-11), StrengthBand::Strong);
        assert_eq!(StrengthBand::classify(9), StrengthBand::Strong);
        assert_eq!(StrengthBand::classify(8), StrengthBand::Medium);
        assert_eq!(StrengthBand::classify(-4), StrengthBand::Medium);
        assert_eq!(StrengthBand::classify(3), StrengthBand::Weak);
        assert_eq!(StrengthBand::classify(0), StrengthBand::Weak);
        assert_eq!(StrengthBand::classify(i32::MIN), StrengthBand::Strong);
    }

    #[test]
    fn zero_leans_right() {
        assert_eq!(Pole::for_score(-1), Pole::Left);
        assert_eq!(Pole::for_score(0), Pole::Right);
        assert_eq!(Pole::for_score(1), Pole::Right);
    }

    #[test]
    fn profiles_are_in_dimension_order() {
        for dimension in Dimension::ALL {
            assert_eq!(dimension.profile().dimension, dimension);
        }
        let columns: Vec<_> = Dimension::ALL.iter().map(|d| d.score_column()).collect();
        assert_eq!(columns, ["积极/沉思", "感官/直觉", "视觉/言语", "顺序/全局"]);
    }

    #[test]
    fn strategies_start_with_their_pole() {
        for profile in &PROFILES {
            for pole in [&profile.left, &profile.right] {
                assert!(pole.strategy.starts_with(pole.label));
                assert!(pole.type_label.starts_with(pole.label));
                assert_eq!(pole.magnitude_column, pole.label);
            }
        }
    }
}
