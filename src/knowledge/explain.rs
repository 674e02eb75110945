//! Plain-language explanation of a final diagnosis.
//!
//! The LLM writes a structured explanation in the session language. When it is
//! unreachable or answers with nothing, a fixed offline template in English,
//! Hindi or Gujarati is returned instead.

use crate::llm::LlmClient;
use crate::service::ServiceOutcome;
use crate::vocabulary::language_key;

use super::language_name;

const EXPLAIN_SYSTEM: &str =
    "You are a careful medical educator writing for patients. Never prescribe doses.";

const OFFLINE_EN: &str = "[Offline explanation]

Disease: {disease}

1. Overview: {disease} is a medical condition that needs proper attention and treatment.
2. Causes: lifestyle, genetic, environmental or underlying health factors.
3. Symptoms: general discomfort, body aches, fatigue and weakness.
4. Diagnosis: medical examination, history and the tests your doctor orders.
5. Treatment: consult a qualified doctor, take prescribed medicines as directed, rest, and follow up regularly.
6. Prevention: balanced diet, regular exercise, enough sleep, less stress.
7. When to see a doctor: symptoms get worse suddenly, severe pain, persistent high fever, or new symptoms.
8. Lifestyle: drink plenty of water, eat fresh fruit and vegetables, avoid smoking and alcohol.

The AI service is unavailable, so this is a standard message. Please consult a healthcare professional.";

const OFFLINE_HI: &str = "[ऑफलाइन स्पष्टीकरण]

रोग: {disease}

1. अवलोकन: {disease} एक चिकित्सा स्थिति है जिस पर उचित ध्यान और उपचार की आवश्यकता है।
2. कारण: जीवनशैली, आनुवंशिक, पर्यावरणीय या अन्य स्वास्थ्य कारक।
3. लक्षण: सामान्य असुविधा, शरीर में दर्द, थकान और कमजोरी।
4. निदान: चिकित्सा परीक्षण और डॉक्टर द्वारा बताई गई जांच।
5. उपचार: डॉक्टर से परामर्श लें, निर्धारित दवाएं लें, आराम करें, नियमित फॉलोअप करें।
6. रोकथाम: स्वस्थ आहार, नियमित व्यायाम, पर्याप्त नींद, कम तनाव।
7. डॉक्टर से कब मिलें: लक्षण अचानक बिगड़ें, तीव्र दर्द हो, बुखार बना रहे या नए लक्षण दिखें।
8. जीवनशैली: भरपूर पानी पिएं, ताजे फल और सब्जियां खाएं, धूम्रपान और शराब से बचें।

AI सेवा उपलब्ध नहीं है, इसलिए यह एक पूर्व-निर्धारित संदेश है। कृपया डॉक्टर से परामर्श लें।";

const OFFLINE_GU: &str = "[ઓફલાઇન સમજૂતી]

રોગ: {disease}

1. ઝાંખી: {disease} એક તબીબી સ્થિતિ છે જે યોગ્ય ધ્યાન અને સારવારની જરૂર છે.
2. કારણો: જીવનશૈલી, આનુવંશિક, પર્યાવરણીય અથવા અન્ય આરોગ્ય પરિબળો.
3. લક્ષણો: સામાન્ય અસ્વસ્થતા, શરીરમાં દુખાવો, થાક અને નબળાઈ.
4. નિદાન: તબીબી પરીક્ષા અને ડોક્ટર કહે તે પરીક્ષણો.
5. સારવાર: ડોક્ટરની સલાહ લો, સૂચવેલ દવાઓ લો, આરામ કરો, નિયમિત ફોલોઅપ કરો.
6. નિવારણ: સ્વસ્થ આહાર, નિયમિત કસરત, પૂરતી ઊંઘ, ઓછો તણાવ.
7. ક્યારે ડોક્ટરને મળવું: લક્ષણો અચાનક વધે, તીવ્ર દુખાવો થાય, તાવ ચાલુ રહે અથવા નવા લક્ષણો દેખાય.
8. જીવનશૈલી: પુષ્કળ પાણી પીવો, તાજાં ફળો અને શાકભાજી ખાઓ, ધૂમ્રપાન અને દારૂ ટાળો.

AI સેવા ઉપલબ્ધ નથી, તેથી આ એક પૂર્વનિર્ધારિત સંદેશ છે. કૃપા કરીને ડોક્ટરની સલાહ લો.";

fn build_explain_prompt(disease: &str, language: &str) -> String {
    format!(
        "Explain '{disease}' in {language} for a patient. Use these sections:\n\
1. OVERVIEW: what the condition is (2-3 sentences)\n\
2. CAUSES\n\
3. SYMPTOMS\n\
4. DIAGNOSIS\n\
5. TREATMENT: step by step\n\
6. PREVENTION\n\
7. WHEN TO SEE A DOCTOR: red flags that need immediate attention\n\
8. LIFESTYLE RECOMMENDATIONS: diet, exercise and daily care\n\
Write in {language} throughout, about 400 words."
    )
}

/// Fixed explanation used when no model is available. Languages other than
/// Hindi and Gujarati get English.
pub fn offline_explanation(disease: &str, language: &str) -> String {
    let template = match language_key(language).as_str() {
        "hi" => OFFLINE_HI,
        "gu" => OFFLINE_GU,
        _ => OFFLINE_EN,
    };
    template.replace("{disease}", disease.trim())
}

/// Ask the model for a structured explanation of `disease` in `language`.
///
/// A failed or empty answer degrades to [`offline_explanation`]. A blank label
/// is the only `Failed` outcome.
pub fn explain_disease(
    client: &dyn LlmClient,
    model: &str,
    disease: &str,
    language: &str,
) -> ServiceOutcome<String> {
    let disease = disease.trim();
    if disease.is_empty() {
        return ServiceOutcome::failed("No disease specified");
    }

    let name = language_name(language);
    let prompt = build_explain_prompt(disease, &name);
    match client.generate(model, &prompt, EXPLAIN_SYSTEM) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::debug!(disease, language = %name, "Disease explanation generated");
            ServiceOutcome::Ok(text.trim().to_string())
        }
        Ok(_) => {
            tracing::warn!(disease, language = %name, "Empty explanation, using offline template");
            ServiceOutcome::degraded(
                offline_explanation(disease, language),
                "Model returned an empty explanation",
            )
        }
        Err(e) => {
            tracing::warn!(disease, language = %name, error = %e, "Explanation failed, using offline template");
            ServiceOutcome::degraded(offline_explanation(disease, language), e.to_string())
        }
    }
}
