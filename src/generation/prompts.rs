use crate::domain::value_objects::enums::genders::Gender;
use crate::domain::value_objects::enums::model_tiers::ModelTier;
use crate::domain::value_objects::saju::SajuInput;

/// Builds the Korean saju analysis prompt. The pro tier appends the
/// career/business and monthly-fortune sections reserved for subscribers.
pub fn generate_saju_prompt(input: &SajuInput, tier: ModelTier) -> String {
    let birth_time_text = input.birth_time_or_unknown();
    let gender_text = match input.gender {
        Gender::Male => "남성",
        Gender::Female => "여성",
    };

    let mut sections = vec![
        "1. **천간(天干)과 지지(地支)**: 생년월일시의 사주팔자를 계산하고 해석",
        "2. **오행(五行) 분석**: 목(木), 화(火), 토(土), 금(金), 수(水)의 균형 분석",
        "3. **대운(大運)과 세운(歲運)**: 인생의 흐름과 현재 운세",
        "4. **성격 분석**: 타고난 성격, 장단점, 대인관계 성향",
        "5. **재운 분석**: 재물운, 재테크 성향, 직업 적성",
        "6. **건강운 분석**: 주의해야 할 건강 부위, 건강 관리 조언",
        "7. **연애운 분석**: 이성관계, 결혼운, 배우자 성향",
    ];
    if tier == ModelTier::Pro {
        sections.push("8. **직업운·사업운 심화 분석**: 커리어 전환 시기, 사업 적성, 협업 궁합");
        sections.push("9. **월별 운세**: 향후 12개월의 흐름을 월 단위로 정리");
    }

    format!(
        "당신은 20년 경력의 전문 사주팔자 상담사입니다.\n\n\
**입력 정보**:\n\
- 성함: {name}\n\
- 생년월일: {birth_date}\n\
- 출생시간: {birth_time}\n\
- 성별: {gender}\n\n\
**분석 요구사항**:\n\
다음 섹션을 포함하여 상세한 사주분석 결과를 마크다운 형식으로 작성해주세요:\n\n\
{sections}\n\n\
**출력 형식**: 마크다운\n\n\
**금지 사항**:\n\
- 의료·법률 조언 금지\n\
- 확정적 미래 예측 금지\n\
- 부정적·공격적 표현 금지\n\n\
각 섹션은 명확한 제목(## 또는 ###)으로 구분하고, 이해하기 쉽게 작성해주세요.",
        name = input.name.trim(),
        birth_date = input.birth_date,
        birth_time = birth_time_text,
        gender = gender_text,
        sections = sections.join("\n"),
    )
}
